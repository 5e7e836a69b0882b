//! Common query patterns for the database.

use crate::error::{Error, Result};
use crate::models::*;
use crate::store::Store;
use signage_core::{Sign, ZoneId};

impl Store {
    /// Signs stored for a zone, in id order.
    pub fn signs_in_zone(&self, zone: ZoneId) -> Result<Vec<Sign>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().secondary::<StoredSign>(StoredSignKey::zone)?;
        let iter = scan.start_with(zone.raw())?;
        let rows: std::result::Result<Vec<StoredSign>, _> = iter.collect();
        let rows = rows.map_err(|e| Error::Database(e.to_string()))?;
        let mut signs = rows
            .iter()
            .map(StoredSign::to_sign)
            .collect::<bincode::Result<Vec<_>>>()?;
        signs.sort_by_key(|s| s.id);
        Ok(signs)
    }

    /// Number of stored sign rows.
    pub fn sign_count(&self) -> Result<usize> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredSign>()?;
        Ok(scan.all()?.count())
    }
}
