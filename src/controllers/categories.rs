use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::{Activatable, Category};
use crate::store;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}", delete(delete_category))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 3, max = 100))]
    pub name: String,
    #[validate(length(min = 2, max = 5))]
    pub abbreviation: Option<String>,
    #[validate(length(equal = 7))]
    pub color: Option<String>,
}

pub async fn list_categories(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let categories = store::categories::list_active(&state.db.pool).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    if store::categories::find_active_by_name(&state.db.pool, &body.name)
        .await?
        .is_some()
    {
        return Err(Error::Conflict(format!("category `{}` already exists", body.name.trim())));
    }

    let mut category = Category::new(
        &body.name,
        body.abbreviation.as_deref(),
        body.color.as_deref(),
    )?;
    store::categories::save(&state.db.pool, &mut category).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let mut category = store::categories::find_active(&state.db.pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("category {id}")))?;
    category.soft_delete(Utc::now());
    store::categories::save(&state.db.pool, &mut category).await?;
    Ok(StatusCode::NO_CONTENT)
}
