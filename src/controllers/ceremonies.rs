use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::{Ceremony, CeremonySummary};
use crate::store::{self, StoreError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ceremonies", get(list_ceremonies).post(create_ceremony))
        .route("/ceremonies/{id}", get(get_ceremony))
        .route("/ceremonies/{id}/confirm", post(confirm_ceremony))
        .route("/ceremonies/{id}/cancel", post(cancel_ceremony))
        .route("/ceremonies/{id}/complete", post(complete_ceremony))
        .route(
            "/ceremonies/{id}/allocation",
            get(get_allocation).post(generate_allocation),
        )
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CourseInput {
    pub category_id: Uuid,
    #[validate(range(min = 1, max = 100000))]
    pub graduates: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCeremonyRequest {
    #[validate(length(min = 3, max = 150))]
    pub name: String,
    pub date: NaiveDate,
    pub venue_id: Uuid,
    #[validate(length(min = 1), nested)]
    pub courses: Vec<CourseInput>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CeremonyDetail {
    #[serde(flatten)]
    pub ceremony: CeremonySummary,
    pub venue_name: Option<String>,
    pub venue_capacity: Option<u32>,
    pub fits_venue: bool,
    pub can_generate_allocation: bool,
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Confirm,
    Complete,
    Cancel,
}

async fn detail(state: &AppState, ceremony: &Ceremony) -> Result<CeremonyDetail> {
    let spg = state.seating.seats_per_graduate();
    let venue = store::venues::find(&state.db.pool, ceremony.venue_id).await?;
    Ok(CeremonyDetail {
        ceremony: ceremony.summary(spg),
        venue_name: venue.as_ref().map(|v| v.name.clone()),
        venue_capacity: venue.as_ref().map(|v| v.total_capacity()),
        fits_venue: venue.as_ref().is_some_and(|v| ceremony.fits_in(v, spg)),
        can_generate_allocation: ceremony.can_generate_allocation(),
    })
}

async fn apply_transition(state: &AppState, id: Uuid, transition: Transition) -> Result<Ceremony> {
    let mut tx = state.db.pool.begin().await.map_err(StoreError::from)?;
    let mut ceremony = store::ceremonies::lock(&mut *tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("ceremony {id}")))?;

    match transition {
        Transition::Confirm => ceremony.confirm()?,
        Transition::Complete => ceremony.complete()?,
        Transition::Cancel => {
            ceremony.cancel()?;
            store::allocations::delete_for_ceremony(&mut *tx, id).await?;
        }
    }
    store::ceremonies::save(&mut *tx, &mut ceremony).await?;
    tx.commit().await.map_err(StoreError::from)?;

    if matches!(transition, Transition::Cancel) {
        state.cache.invalidate_report(id).await;
    }
    tracing::info!("Ceremony {} is now {}", id, ceremony.status());
    Ok(ceremony)
}

pub async fn list_ceremonies(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let spg = state.seating.seats_per_graduate();
    let ceremonies: Vec<CeremonySummary> = store::ceremonies::list_active(&state.db.pool)
        .await?
        .iter()
        .map(|c| c.summary(spg))
        .collect();
    Ok(Json(ceremonies))
}

pub async fn create_ceremony(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCeremonyRequest>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    store::venues::find_active(&state.db.pool, body.venue_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("venue {}", body.venue_id)))?;

    let mut ceremony = Ceremony::new(&body.name, body.date, body.venue_id);
    ceremony.notes = body.notes.clone();
    for course in &body.courses {
        store::categories::find_active(&state.db.pool, course.category_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("category {}", course.category_id)))?;
        ceremony.add_course(course.category_id, course.graduates)?;
    }
    ceremony.validate()?;
    store::ceremonies::save(&state.db.pool, &mut ceremony).await?;

    tracing::info!("Ceremony {} created with {} courses", ceremony.id, ceremony.courses().len());
    Ok((StatusCode::CREATED, Json(detail(&state, &ceremony).await?)))
}

pub async fn get_ceremony(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let ceremony = store::ceremonies::find_active(&state.db.pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("ceremony {id}")))?;
    Ok(Json(detail(&state, &ceremony).await?))
}

pub async fn confirm_ceremony(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let ceremony = apply_transition(&state, id, Transition::Confirm).await?;
    Ok(Json(detail(&state, &ceremony).await?))
}

pub async fn complete_ceremony(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let ceremony = apply_transition(&state, id, Transition::Complete).await?;
    Ok(Json(detail(&state, &ceremony).await?))
}

pub async fn cancel_ceremony(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let ceremony = apply_transition(&state, id, Transition::Cancel).await?;
    Ok(Json(detail(&state, &ceremony).await?))
}

/// Body is optional; an empty one means no notes.
pub async fn generate_allocation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let request: GenerateRequest = if body.is_empty() {
        GenerateRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| Error::BadRequest(format!("invalid body: {e}")))?
    };
    request.validate()?;

    let report = state.seating.generate(id, request.notes.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get_allocation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let report = state.seating.report(id).await?;
    Ok(Json(report))
}
