//! Per-sign rows, indexed by zone.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use signage_core::Sign;

/// One sign, kept alongside the registry snapshot for zone lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredSign {
    #[primary_key]
    pub id: u64,
    /// Zone id, 0 when unset.
    #[secondary_key]
    pub zone: u64,
    pub number: String,
    pub payload: Vec<u8>,
}

impl StoredSign {
    pub fn from_sign(sign: &Sign) -> bincode::Result<Self> {
        Ok(Self {
            id: sign.id.raw(),
            zone: sign.zone.map(|z| z.raw()).unwrap_or(0),
            number: sign.number.clone(),
            payload: bincode::serialize(sign)?,
        })
    }

    pub fn to_sign(&self) -> bincode::Result<Sign> {
        bincode::deserialize(&self.payload)
    }
}
