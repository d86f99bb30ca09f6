use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, LayoutError, Result};
use crate::models::{Activatable, RowDistribution, Venue, VenueSummary};
use crate::store;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/venues", get(list_venues).post(create_venue))
        .route("/venues/capacity", get(venues_with_capacity))
        .route("/venues/{id}", get(get_venue).delete(delete_venue))
        .route("/venues/{id}/restore", post(restore_venue))
        .route("/venues/{id}/distribution", get(venue_distribution))
        .route("/venues/{id}/rows", post(add_row))
        .route("/venues/{id}/rows/{code}", patch(update_row).delete(remove_row))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RowInput {
    #[validate(length(min = 2, max = 10))]
    pub code: String,
    #[validate(range(min = 1, max = 100))]
    pub capacity: u32,
    #[validate(range(min = 1))]
    pub order: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVenueRequest {
    #[validate(length(min = 3, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(min = 1), nested)]
    pub rows: Vec<RowInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRowRequest {
    #[validate(range(min = 1, max = 100))]
    pub capacity: Option<u32>,
    #[validate(range(min = 1))]
    pub order: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Deserialize)]
pub struct CapacityQuery {
    pub min_seats: u32,
}

#[derive(Debug, Serialize)]
pub struct VenueDetail {
    #[serde(flatten)]
    pub venue: VenueSummary,
    pub distribution: Option<RowDistribution>,
}

impl From<&Venue> for VenueDetail {
    fn from(venue: &Venue) -> Self {
        Self {
            venue: VenueSummary::from(venue),
            distribution: venue.row_distribution(),
        }
    }
}

async fn load_venue(state: &AppState, id: Uuid) -> Result<Venue> {
    store::venues::find_active(&state.db.pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("venue {id}")))
}

async fn persist(state: &AppState, venue: &mut Venue) -> Result<()> {
    venue.validate()?;
    store::venues::save(&state.db.pool, venue).await?;
    state.cache.invalidate_venues().await;
    Ok(())
}

pub async fn list_venues(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let venues = state.cache.get_venues().await?;
    Ok(Json(venues))
}

pub async fn venues_with_capacity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CapacityQuery>,
) -> Result<impl IntoResponse> {
    let venues: Vec<VenueSummary> = state
        .cache
        .get_venues()
        .await?
        .into_iter()
        .filter(|v| v.total_capacity >= query.min_seats)
        .collect();
    Ok(Json(venues))
}

pub async fn create_venue(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateVenueRequest>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let mut venue = Venue::new(&body.name, body.description.as_deref());
    for row in &body.rows {
        venue.add_row(&row.code, row.capacity, row.order)?;
    }
    persist(&state, &mut venue).await?;

    tracing::info!(
        "Venue {} created with {} rows, {} seats",
        venue.id,
        venue.total_rows(),
        venue.total_capacity()
    );
    Ok((StatusCode::CREATED, Json(VenueDetail::from(&venue))))
}

pub async fn get_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let venue = load_venue(&state, id).await?;
    Ok(Json(VenueDetail::from(&venue)))
}

pub async fn venue_distribution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let venue = load_venue(&state, id).await?;
    let distribution = venue
        .row_distribution()
        .ok_or_else(|| LayoutError::InvalidVenue(format!("venue {id} has no rows")))?;
    Ok(Json(distribution))
}

pub async fn delete_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse> {
    if query.hard {
        let ceremonies = store::ceremonies::count_for_venue(&state.db.pool, id).await?;
        if ceremonies > 0 {
            return Err(Error::Conflict(format!(
                "venue {id} is used by {ceremonies} ceremonies"
            )));
        }
        if !store::venues::hard_delete(&state.db.pool, id).await? {
            return Err(Error::NotFound(format!("venue {id}")));
        }
    } else {
        let mut venue = load_venue(&state, id).await?;
        venue.soft_delete(Utc::now());
        store::venues::save(&state.db.pool, &mut venue).await?;
    }

    state.cache.invalidate_venues().await;
    tracing::info!("Venue {} deleted (hard: {})", id, query.hard);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let mut venue = store::venues::find(&state.db.pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("venue {id}")))?;
    if venue.is_active() {
        return Err(Error::Conflict(format!("venue {id} is not deleted")));
    }
    venue.restore();
    persist(&state, &mut venue).await?;
    Ok(Json(VenueDetail::from(&venue)))
}

pub async fn add_row(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<RowInput>,
) -> Result<impl IntoResponse> {
    body.validate()?;
    let mut venue = load_venue(&state, id).await?;
    venue.add_row(&body.code, body.capacity, body.order)?;
    persist(&state, &mut venue).await?;
    Ok((StatusCode::CREATED, Json(VenueDetail::from(&venue))))
}

pub async fn update_row(
    State(state): State<Arc<AppState>>,
    Path((id, code)): Path<(Uuid, String)>,
    Json(body): Json<UpdateRowRequest>,
) -> Result<impl IntoResponse> {
    body.validate()?;
    let mut venue = load_venue(&state, id).await?;
    venue.update_row(&code, body.capacity, body.order)?;
    persist(&state, &mut venue).await?;
    Ok(Json(VenueDetail::from(&venue)))
}

pub async fn remove_row(
    State(state): State<Arc<AppState>>,
    Path((id, code)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse> {
    let mut venue = load_venue(&state, id).await?;
    // idempotent: removing an absent row leaves the venue as it is
    if venue.remove_row(&code) > 0 {
        // the last row cannot go: validate() rejects an empty layout
        persist(&state, &mut venue).await?;
    }
    Ok(Json(VenueDetail::from(&venue)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, capacity: u32) -> RowInput {
        RowInput {
            code: code.to_string(),
            capacity,
            order: None,
        }
    }

    #[test]
    fn venue_request_validates_each_row() {
        let request = CreateVenueRequest {
            name: "Main Hall".into(),
            description: None,
            rows: vec![row("1A", 20), row("1B", 0)],
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.errors().contains_key("rows"));

        let ok = CreateVenueRequest {
            rows: vec![row("1A", 20), row("1B", 12)],
            ..request
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn venue_request_needs_at_least_one_row() {
        let request = CreateVenueRequest {
            name: "Main Hall".into(),
            description: None,
            rows: Vec::new(),
        };
        assert!(request.validate().is_err());
    }
}
