use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use super::{map_unique, StoreError};
use crate::models::{ActiveState, Category};

const COLUMNS: &str = "id, name, abbreviation, color, active, deleted_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct CategoryRecord {
    id: Uuid,
    name: String,
    abbreviation: Option<String>,
    color: Option<String>,
    active: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRecord> for Category {
    fn from(r: CategoryRecord) -> Self {
        Category {
            id: r.id,
            name: r.name,
            abbreviation: r.abbreviation,
            color: r.color,
            state: ActiveState {
                active: r.active,
                deleted_at: r.deleted_at,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub async fn find_active<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Category>, StoreError> {
    let record = sqlx::query_as::<_, CategoryRecord>(&format!(
        "SELECT {COLUMNS} FROM categories WHERE id = $1 AND active"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(record.map(Category::from))
}

/// Case-insensitive lookup used when importing courses by name.
pub async fn find_active_by_name<'e, E: PgExecutor<'e>>(
    executor: E,
    name: &str,
) -> Result<Option<Category>, StoreError> {
    let record = sqlx::query_as::<_, CategoryRecord>(&format!(
        "SELECT {COLUMNS} FROM categories WHERE LOWER(name) = LOWER($1) AND active"
    ))
    .bind(name.trim())
    .fetch_optional(executor)
    .await?;
    Ok(record.map(Category::from))
}

pub async fn find_many<'e, E: PgExecutor<'e>>(
    executor: E,
    ids: &[Uuid],
) -> Result<Vec<Category>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let records = sqlx::query_as::<_, CategoryRecord>(&format!(
        "SELECT {COLUMNS} FROM categories WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(executor)
    .await?;
    Ok(records.into_iter().map(Category::from).collect())
}

pub async fn list_active<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Category>, StoreError> {
    let records = sqlx::query_as::<_, CategoryRecord>(&format!(
        "SELECT {COLUMNS} FROM categories WHERE active ORDER BY name"
    ))
    .fetch_all(executor)
    .await?;
    Ok(records.into_iter().map(Category::from).collect())
}

pub async fn save<'e, E: PgExecutor<'e>>(executor: E, category: &mut Category) -> Result<(), StoreError> {
    category.updated_at = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO categories (id, name, abbreviation, color, active, deleted_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            abbreviation = EXCLUDED.abbreviation,
            color = EXCLUDED.color,
            active = EXCLUDED.active,
            deleted_at = EXCLUDED.deleted_at,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(category.id)
    .bind(&category.name)
    .bind(&category.abbreviation)
    .bind(&category.color)
    .bind(category.state.active)
    .bind(category.state.deleted_at)
    .bind(category.created_at)
    .bind(category.updated_at)
    .execute(executor)
    .await
    .map_err(|e| map_unique(e, || format!("category `{}`", category.name)))?;

    Ok(())
}
