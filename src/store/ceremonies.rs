use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{types::Json, FromRow, PgExecutor};
use uuid::Uuid;

use super::StoreError;
use crate::models::{ActiveState, Ceremony, CeremonyCourse, CeremonyStatus};

const COLUMNS: &str = "id, name, date, venue_id, courses, notes, status, allocation_generated, \
                       active, deleted_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct CeremonyRecord {
    id: Uuid,
    name: String,
    date: NaiveDate,
    venue_id: Uuid,
    courses: Json<Vec<CeremonyCourse>>,
    notes: Option<String>,
    status: String,
    allocation_generated: bool,
    active: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CeremonyRecord {
    fn into_ceremony(self) -> Result<Ceremony, StoreError> {
        let id = self.id;
        let corrupt = |e: crate::error::RecordError| StoreError::Corrupt {
            entity: "ceremony",
            id,
            reason: e.to_string(),
        };
        let status: CeremonyStatus = self.status.parse().map_err(corrupt)?;
        Ceremony::from_stored(
            self.id,
            self.name,
            self.date,
            self.venue_id,
            self.courses.0,
            self.notes,
            status,
            self.allocation_generated,
            ActiveState {
                active: self.active,
                deleted_at: self.deleted_at,
            },
            self.created_at,
            self.updated_at,
        )
        .map_err(corrupt)
    }
}

pub async fn find_active<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Ceremony>, StoreError> {
    let record = sqlx::query_as::<_, CeremonyRecord>(&format!(
        "SELECT {COLUMNS} FROM ceremonies WHERE id = $1 AND active"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    record.map(CeremonyRecord::into_ceremony).transpose()
}

/// Same as `find_active` but holds a row lock until the transaction ends, so
/// two allocation runs for one ceremony serialize.
pub async fn lock<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Ceremony>, StoreError> {
    let record = sqlx::query_as::<_, CeremonyRecord>(&format!(
        "SELECT {COLUMNS} FROM ceremonies WHERE id = $1 AND active FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    record.map(CeremonyRecord::into_ceremony).transpose()
}

/// Active ceremonies that are not cancelled, soonest first.
pub async fn list_active<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Ceremony>, StoreError> {
    sqlx::query_as::<_, CeremonyRecord>(&format!(
        "SELECT {COLUMNS} FROM ceremonies WHERE active AND status <> 'cancelled' ORDER BY date, name"
    ))
    .fetch_all(executor)
    .await?
    .into_iter()
    .map(CeremonyRecord::into_ceremony)
    .collect()
}

/// Looks for an earlier import of the same ceremony.
pub async fn find_matching<'e, E: PgExecutor<'e>>(
    executor: E,
    name: &str,
    date: NaiveDate,
    venue_id: Uuid,
) -> Result<Option<Ceremony>, StoreError> {
    let record = sqlx::query_as::<_, CeremonyRecord>(&format!(
        "SELECT {COLUMNS} FROM ceremonies \
         WHERE LOWER(name) = LOWER($1) AND date = $2 AND venue_id = $3 AND active \
         ORDER BY created_at LIMIT 1"
    ))
    .bind(name)
    .bind(date)
    .bind(venue_id)
    .fetch_optional(executor)
    .await?;
    record.map(CeremonyRecord::into_ceremony).transpose()
}

pub async fn count_for_venue<'e, E: PgExecutor<'e>>(executor: E, venue_id: Uuid) -> Result<i64, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ceremonies WHERE venue_id = $1")
        .bind(venue_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

pub async fn save<'e, E: PgExecutor<'e>>(executor: E, ceremony: &mut Ceremony) -> Result<(), StoreError> {
    ceremony.touch();

    sqlx::query(
        r#"
        INSERT INTO ceremonies (id, name, date, venue_id, courses, notes, status, allocation_generated,
                                active, deleted_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            date = EXCLUDED.date,
            venue_id = EXCLUDED.venue_id,
            courses = EXCLUDED.courses,
            notes = EXCLUDED.notes,
            status = EXCLUDED.status,
            allocation_generated = EXCLUDED.allocation_generated,
            active = EXCLUDED.active,
            deleted_at = EXCLUDED.deleted_at,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(ceremony.id)
    .bind(&ceremony.name)
    .bind(ceremony.date)
    .bind(ceremony.venue_id)
    .bind(Json(ceremony.courses()))
    .bind(&ceremony.notes)
    .bind(ceremony.status().as_str())
    .bind(ceremony.allocation_generated())
    .bind(ceremony.state.active)
    .bind(ceremony.state.deleted_at)
    .bind(ceremony.created_at)
    .bind(ceremony.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Removes the ceremony outright; its allocation goes with it (cascade).
pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM ceremonies WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
