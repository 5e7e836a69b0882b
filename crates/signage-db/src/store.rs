//! Database store wrapper.

use crate::error::{Error, Result};
use crate::models::*;
use native_db::*;
use signage_core::{InMemoryGrants, Registry, Sign, SignId};
use std::path::Path;
use std::sync::LazyLock;

// Static models for the database
static MODELS: LazyLock<std::result::Result<Models, String>> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredRegistry>().map_err(|e| e.to_string())?;
    models.define::<StoredGrants>().map_err(|e| e.to_string())?;
    models.define::<StoredSign>().map_err(|e| e.to_string())?;
    Ok(models)
});

fn models() -> Result<&'static Models> {
    MODELS.as_ref().map_err(|e| Error::Database(e.clone()))
}

/// Durable storage for the registry and grants.
pub struct Store {
    pub(crate) db: Database<'static>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new().create(models()?, path.as_ref())?;
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new().create_in_memory(models()?)?;
        Ok(Self { db })
    }

    /// Save every record, replacing the previous snapshot and sign rows.
    pub fn save_registry(&self, registry: &Registry) -> Result<()> {
        let stale: Vec<StoredSign> = {
            let r = self.db.r_transaction()?;
            let scan = r.scan().primary::<StoredSign>()?;
            let rows: std::result::Result<Vec<StoredSign>, _> = scan.all()?.collect();
            rows.map_err(|e| Error::Database(e.to_string()))?
        };

        let rw = self.db.rw_transaction()?;
        for row in stale {
            if registry.sign(SignId::new(row.id)).is_none() {
                rw.remove(row)?;
            }
        }
        for sign in registry.signs() {
            rw.upsert(StoredSign::from_sign(sign)?)?;
        }
        rw.upsert(StoredRegistry::from_registry(registry)?)?;
        rw.commit()?;
        tracing::debug!(signs = registry.sign_count(), "Saved registry");
        Ok(())
    }

    /// Load the last saved registry, empty if none was saved.
    pub fn load_registry(&self) -> Result<Registry> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredRegistry> = r.get().primary(REGISTRY_KEY.to_string())?;
        match stored {
            Some(stored) => Ok(stored.to_registry()?),
            None => Ok(Registry::new()),
        }
    }

    pub fn save_grants(&self, grants: &InMemoryGrants) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        rw.upsert(StoredGrants::from_grants(grants)?)?;
        rw.commit()?;
        Ok(())
    }

    pub fn load_grants(&self) -> Result<InMemoryGrants> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredGrants> = r.get().primary(GRANTS_KEY.to_string())?;
        match stored {
            Some(stored) => Ok(stored.to_grants()?),
            None => Ok(InMemoryGrants::new()),
        }
    }

    /// Load one sign from its row.
    pub fn load_sign(&self, id: SignId) -> Result<Option<Sign>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredSign> = r.get().primary(id.raw())?;
        Ok(stored.map(|s| s.to_sign()).transpose()?)
    }
}
