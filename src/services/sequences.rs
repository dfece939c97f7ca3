use crate::config::AllocationMode;
use crate::db::Gateway;
use crate::errors::ServiceError;
use sea_orm::Value;
use tracing::{debug, instrument};

const SEQUENCE_SELECT: &str =
    "SELECT NEXTVAL FROM NUMBERSEQUENCETABLE WHERE DATAAREAID = ? AND SEQUENCENAME = ?";

const SEQUENCE_UPDATE: &str =
    "UPDATE NUMBERSEQUENCETABLE SET NEXTVAL = ? WHERE DATAAREAID = ? AND SEQUENCENAME = ?";

// Peek and advance collapsed into one statement for the db-atomic mode.
// NEXTVAL is stored as its string encoding, hence the casts. BIGINT keeps
// the returned column 64-bit on PostgreSQL, where INTEGER would come back
// as a 4-byte column the i64 decode rejects.
const SEQUENCE_FETCH_ADD: &str = "UPDATE NUMBERSEQUENCETABLE \
     SET NEXTVAL = CAST(CAST(NEXTVAL AS BIGINT) + 1 AS VARCHAR) \
     WHERE DATAAREAID = ? AND SEQUENCENAME = ? \
     RETURNING CAST(NEXTVAL AS BIGINT) - 1 AS ALLOCATED";

/// Reads and advances named monotonic counters stored in
/// `NUMBERSEQUENCETABLE`, keyed by (data area, sequence name) with the next
/// value string-encoded.
///
/// `peek_next` and `advance` are two independent round trips; in `legacy`
/// mode concurrent callers can observe the same peeked value before either
/// advances. `allocate` is the strategy-aware entry point the pipeline uses.
#[derive(Clone)]
pub struct SequenceAllocator {
    gateway: Gateway,
    data_area: String,
    mode: AllocationMode,
}

impl SequenceAllocator {
    pub fn new(gateway: Gateway, data_area: impl Into<String>, mode: AllocationMode) -> Self {
        Self {
            gateway,
            data_area: data_area.into(),
            mode,
        }
    }

    /// Reads the counter's current value without reserving it.
    ///
    /// # Errors
    /// `AllocationError` when no row exists for the sequence or the stored
    /// value is not an integer.
    #[instrument(skip(self), fields(sequence = %sequence))]
    pub async fn peek_next(&self, sequence: &str) -> Result<i64, ServiceError> {
        let raw = self
            .gateway
            .query_one(
                SEQUENCE_SELECT,
                vec![
                    Value::from(self.data_area.as_str()),
                    Value::from(sequence),
                ],
                |row| row.try_get::<String>("", "NEXTVAL"),
            )
            .await
            .map_err(|e| {
                ServiceError::AllocationError(format!("sequence {} lookup failed: {}", sequence, e))
            })?
            .ok_or_else(|| {
                ServiceError::AllocationError(format!("sequence {} has no counter row", sequence))
            })?;

        raw.trim().parse::<i64>().map_err(|_| {
            ServiceError::AllocationError(format!(
                "sequence {} holds non-numeric value {:?}",
                sequence, raw
            ))
        })
    }

    /// Writes `current + 1` back, encoded as a string. The caller supplies
    /// the value it peeked; in legacy mode nothing stops a concurrent caller
    /// from writing the same slot.
    #[instrument(skip(self), fields(sequence = %sequence))]
    pub async fn advance(&self, sequence: &str, current: i64) -> Result<(), ServiceError> {
        let affected = self
            .gateway
            .execute(
                SEQUENCE_UPDATE,
                vec![
                    Value::from((current + 1).to_string()),
                    Value::from(self.data_area.as_str()),
                    Value::from(sequence),
                ],
            )
            .await
            .map_err(|e| {
                ServiceError::AllocationError(format!(
                    "sequence {} advance failed: {}",
                    sequence, e
                ))
            })?;

        if affected == 0 {
            return Err(ServiceError::AllocationError(format!(
                "sequence {} advance updated no rows",
                sequence
            )));
        }

        debug!(sequence = %sequence, next = current + 1, "sequence advanced");
        Ok(())
    }

    /// Returns the value to use and makes the advance visible to subsequent
    /// callers, dispatching on the configured allocation mode.
    pub async fn allocate(&self, sequence: &str) -> Result<i64, ServiceError> {
        match self.mode {
            AllocationMode::DbAtomic => self.fetch_add(sequence).await,
            AllocationMode::Legacy | AllocationMode::Serialized => {
                let value = self.peek_next(sequence).await?;
                self.advance(sequence, value).await?;
                Ok(value)
            }
        }
    }

    async fn fetch_add(&self, sequence: &str) -> Result<i64, ServiceError> {
        self.gateway
            .query_one(
                SEQUENCE_FETCH_ADD,
                vec![
                    Value::from(self.data_area.as_str()),
                    Value::from(sequence),
                ],
                |row| row.try_get::<i64>("", "ALLOCATED"),
            )
            .await
            .map_err(|e| {
                ServiceError::AllocationError(format!(
                    "sequence {} atomic advance failed: {}",
                    sequence, e
                ))
            })?
            .ok_or_else(|| {
                ServiceError::AllocationError(format!("sequence {} has no counter row", sequence))
            })
    }
}

/// Formats a raw inventory-transaction counter value the way downstream
/// consumers expect it: zero-padded to `width` digits plus a fixed tag,
/// e.g. `00001234_078`.
pub fn format_invent_trans_id(raw: i64, width: usize, suffix: &str) -> String {
    format!("{:0width$}{}", raw, suffix, width = width)
}
