use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgExecutor};
use uuid::Uuid;

use super::StoreError;
use crate::models::{Allocation, CategoryDemand, Row, SeatBlock};

/// An allocation as persisted for one ceremony.
#[derive(Debug, Clone)]
pub struct StoredAllocation {
    pub id: Uuid,
    pub ceremony_id: Uuid,
    pub venue_id: Uuid,
    pub allocation: Allocation,
    pub checksum: String,
    pub notes: Option<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AllocationRecord {
    id: Uuid,
    ceremony_id: Uuid,
    venue_id: Uuid,
    rows: Json<Vec<Row>>,
    demands: Json<Vec<CategoryDemand>>,
    blocks: Json<Vec<SeatBlock>>,
    checksum: String,
    notes: Option<String>,
    generated_at: DateTime<Utc>,
}

impl AllocationRecord {
    // A stored allocation is only trusted if it still verifies and hashes to
    // the checksum written alongside it.
    fn into_stored(self) -> Result<StoredAllocation, StoreError> {
        let id = self.id;
        let allocation = Allocation::from_parts(self.rows.0, self.demands.0, self.blocks.0);
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "allocation",
            id,
            reason,
        };

        allocation.verify().map_err(|e| corrupt(e.to_string()))?;
        let checksum = self.checksum.trim().to_string();
        if allocation.checksum() != checksum {
            return Err(corrupt("checksum mismatch".to_string()));
        }

        Ok(StoredAllocation {
            id,
            ceremony_id: self.ceremony_id,
            venue_id: self.venue_id,
            allocation,
            checksum,
            notes: self.notes,
            generated_at: self.generated_at,
        })
    }
}

/// Writes the allocation for `ceremony_id`, replacing any earlier one.
/// The caller is expected to have verified it.
pub async fn replace<'e, E: PgExecutor<'e>>(
    executor: E,
    ceremony_id: Uuid,
    venue_id: Uuid,
    allocation: &Allocation,
    notes: Option<&str>,
) -> Result<StoredAllocation, StoreError> {
    let record = sqlx::query_as::<_, AllocationRecord>(
        r#"
        INSERT INTO allocations (id, ceremony_id, venue_id, rows, demands, blocks, checksum, notes, generated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (ceremony_id) DO UPDATE SET
            venue_id = EXCLUDED.venue_id,
            rows = EXCLUDED.rows,
            demands = EXCLUDED.demands,
            blocks = EXCLUDED.blocks,
            checksum = EXCLUDED.checksum,
            notes = EXCLUDED.notes,
            generated_at = EXCLUDED.generated_at
        RETURNING id, ceremony_id, venue_id, rows, demands, blocks, checksum, notes, generated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(ceremony_id)
    .bind(venue_id)
    .bind(Json(allocation.rows()))
    .bind(Json(allocation.demands()))
    .bind(Json(allocation.blocks()))
    .bind(allocation.checksum())
    .bind(notes)
    .fetch_one(executor)
    .await?;

    record.into_stored()
}

pub async fn find_for_ceremony<'e, E: PgExecutor<'e>>(
    executor: E,
    ceremony_id: Uuid,
) -> Result<Option<StoredAllocation>, StoreError> {
    let record = sqlx::query_as::<_, AllocationRecord>(
        "SELECT id, ceremony_id, venue_id, rows, demands, blocks, checksum, notes, generated_at \
         FROM allocations WHERE ceremony_id = $1",
    )
    .bind(ceremony_id)
    .fetch_optional(executor)
    .await?;
    record.map(AllocationRecord::into_stored).transpose()
}

pub async fn delete_for_ceremony<'e, E: PgExecutor<'e>>(
    executor: E,
    ceremony_id: Uuid,
) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM allocations WHERE ceremony_id = $1")
        .bind(ceremony_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
