use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/sheets/import", post(import_sheet))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImportSheetRequest {
    /// CSV export link, e.g. `https://docs.google.com/spreadsheets/d/{ID}/export?format=csv`.
    #[validate(url)]
    pub url: String,
    pub venue_id: Uuid,
    /// Replace a ceremony already imported from the same sheet.
    #[serde(default)]
    pub overwrite: bool,
}

pub async fn import_sheet(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImportSheetRequest>,
) -> Result<impl IntoResponse> {
    body.validate()?;

    let outcome = state
        .seating
        .import_sheet(&body.url, body.venue_id, body.overwrite)
        .await?;
    let status = if outcome.already_existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}
