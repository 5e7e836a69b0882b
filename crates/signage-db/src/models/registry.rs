//! Whole-registry and grant snapshots.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use signage_core::{InMemoryGrants, Registry};

pub(crate) const REGISTRY_KEY: &str = "registry";
pub(crate) const GRANTS_KEY: &str = "grants";

/// Stored registry: every record, bincode encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredRegistry {
    #[primary_key]
    pub key: String,
    pub payload: Vec<u8>,
}

impl StoredRegistry {
    pub fn from_registry(registry: &Registry) -> bincode::Result<Self> {
        Ok(Self {
            key: REGISTRY_KEY.to_string(),
            payload: bincode::serialize(registry)?,
        })
    }

    pub fn to_registry(&self) -> bincode::Result<Registry> {
        bincode::deserialize(&self.payload)
    }
}

/// Stored group grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredGrants {
    #[primary_key]
    pub key: String,
    pub payload: Vec<u8>,
}

impl StoredGrants {
    pub fn from_grants(grants: &InMemoryGrants) -> bincode::Result<Self> {
        Ok(Self {
            key: GRANTS_KEY.to_string(),
            payload: bincode::serialize(grants)?,
        })
    }

    pub fn to_grants(&self) -> bincode::Result<InMemoryGrants> {
        bincode::deserialize(&self.payload)
    }
}
