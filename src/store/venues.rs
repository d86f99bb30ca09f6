use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgExecutor};
use uuid::Uuid;

use super::{map_unique, StoreError};
use crate::models::{ActiveState, Row, Venue};

const COLUMNS: &str = "id, name, description, rows, active, deleted_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct VenueRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    rows: Json<Vec<Row>>,
    active: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VenueRecord {
    fn into_venue(self) -> Result<Venue, StoreError> {
        let id = self.id;
        Venue::from_stored(
            self.id,
            self.name,
            self.description,
            self.rows.0,
            ActiveState {
                active: self.active,
                deleted_at: self.deleted_at,
            },
            self.created_at,
            self.updated_at,
        )
        .map_err(|e| StoreError::Corrupt {
            entity: "venue",
            id,
            reason: e.to_string(),
        })
    }
}

/// Any venue, active or soft-deleted.
pub async fn find<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Venue>, StoreError> {
    let record = sqlx::query_as::<_, VenueRecord>(&format!("SELECT {COLUMNS} FROM venues WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    record.map(VenueRecord::into_venue).transpose()
}

pub async fn find_active<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Venue>, StoreError> {
    let record = sqlx::query_as::<_, VenueRecord>(&format!(
        "SELECT {COLUMNS} FROM venues WHERE id = $1 AND active"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    record.map(VenueRecord::into_venue).transpose()
}

pub async fn list_active<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Venue>, StoreError> {
    sqlx::query_as::<_, VenueRecord>(&format!(
        "SELECT {COLUMNS} FROM venues WHERE active ORDER BY name"
    ))
    .fetch_all(executor)
    .await?
    .into_iter()
    .map(VenueRecord::into_venue)
    .collect()
}

/// Inserts or updates the venue. Rows are put in canonical order first.
pub async fn save<'e, E: PgExecutor<'e>>(executor: E, venue: &mut Venue) -> Result<(), StoreError> {
    venue.sort_rows();
    venue.touch();

    sqlx::query(
        r#"
        INSERT INTO venues (id, name, description, rows, active, deleted_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            rows = EXCLUDED.rows,
            active = EXCLUDED.active,
            deleted_at = EXCLUDED.deleted_at,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(venue.id)
    .bind(&venue.name)
    .bind(&venue.description)
    .bind(Json(venue.rows()))
    .bind(venue.state.active)
    .bind(venue.state.deleted_at)
    .bind(venue.created_at)
    .bind(venue.updated_at)
    .execute(executor)
    .await
    .map_err(|e| map_unique(e, || format!("venue `{}`", venue.name)))?;

    Ok(())
}

pub async fn hard_delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM venues WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
