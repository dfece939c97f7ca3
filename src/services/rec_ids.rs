use crate::db::Gateway;
use crate::errors::ServiceError;
use std::collections::HashSet;
use tracing::instrument;

/// Finds a usable primary-key value for a target table by scanning for the
/// lowest unused id. Ids freed by deletions are reclaimed; this is not an
/// auto-increment. The returned value is not reserved, so a concurrent
/// caller can mint the same id before either insert lands (see the
/// allocation-mode discussion in `config`).
#[derive(Clone)]
pub struct RecordIdAllocator {
    gateway: Gateway,
}

impl RecordIdAllocator {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Returns the smallest missing integer in the table's RECID column, or
    /// 1 when the table is empty.
    ///
    /// `table` is always a compile-time constant at the call sites; it is
    /// interpolated, not bound.
    ///
    /// # Errors
    /// `AllocationError` when the scan cannot execute.
    #[instrument(skip(self), fields(table = %table))]
    pub async fn next_id(&self, table: &str) -> Result<i64, ServiceError> {
        let sql = format!("SELECT RECID FROM {}", table);
        let ids = self
            .gateway
            .query(&sql, vec![], |row| row.try_get::<i64>("", "RECID"))
            .await
            .map_err(|e| {
                ServiceError::AllocationError(format!("record-id scan of {} failed: {}", table, e))
            })?;

        Ok(lowest_free_id(&ids))
    }
}

/// Smallest member of `{ id+1 : id in ids, id+1 not in ids }`, or 1 when the
/// candidate set is empty.
pub fn lowest_free_id(ids: &[i64]) -> i64 {
    let existing: HashSet<i64> = ids.iter().copied().collect();
    ids.iter()
        .map(|id| id + 1)
        .filter(|candidate| !existing.contains(candidate))
        .min()
        .unwrap_or(1)
}
