//! Maps service errors onto HTTP responses with a machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AllocationError, Error, LayoutError, RecordError};
use crate::services::sheet::SheetError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Error {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Layout(e) => match e {
                LayoutError::InvalidRow { .. } => (StatusCode::BAD_REQUEST, "INVALID_ROW"),
                LayoutError::InvalidVenue(_) => (StatusCode::BAD_REQUEST, "INVALID_VENUE"),
                LayoutError::DuplicateRow(_) => (StatusCode::CONFLICT, "DUPLICATE_ROW"),
                LayoutError::RowNotFound(_) => (StatusCode::NOT_FOUND, "ROW_NOT_FOUND"),
            },
            Error::Allocation(e) => match e {
                AllocationError::InvalidDemand(_) => (StatusCode::BAD_REQUEST, "INVALID_DEMAND"),
                AllocationError::InsufficientCapacity { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_CAPACITY")
                }
                AllocationError::SeatConflict { .. } => (StatusCode::CONFLICT, "SEAT_CONFLICT"),
                AllocationError::AllocationFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "ALLOCATION_FAILED")
                }
            },
            Error::Record(e) => match e {
                RecordError::Invalid { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                RecordError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            },
            Error::Store(e) => match e {
                StoreError::Duplicate(_) => (StatusCode::CONFLICT, "DUPLICATE"),
                StoreError::Corrupt { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CORRUPT_RECORD"),
                StoreError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            },
            Error::Sheet(e) => match e {
                SheetError::NotEnoughData | SheetError::Csv(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_SHEET")
                }
                SheetError::Fetch(_) | SheetError::Status(_) => {
                    (StatusCode::BAD_GATEWAY, "SHEET_UNAVAILABLE")
                }
            },
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Error::Allocation(AllocationError::InsufficientCapacity { required, available }) => {
                Some(json!({ "required": required, "available": available }))
            }
            Error::Allocation(AllocationError::SeatConflict { row, seat, .. }) => {
                Some(json!({ "row": row, "seat": seat }))
            }
            Error::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{} {}: {}", status, code, self);
        } else {
            tracing::warn!("Request rejected with {} {}: {}", status, code, self);
        }

        let body = ApiError {
            code,
            message: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_errors_map_to_client_statuses() {
        let cases = [
            (Error::from(LayoutError::invalid_row("0A", "bad")), StatusCode::BAD_REQUEST),
            (Error::from(LayoutError::DuplicateRow("1A".into())), StatusCode::CONFLICT),
            (Error::from(LayoutError::RowNotFound("9Z".into())), StatusCode::NOT_FOUND),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_and_code().0, status);
        }
    }

    #[test]
    fn insufficient_capacity_carries_both_counts() {
        let error = Error::from(AllocationError::InsufficientCapacity {
            required: 9,
            available: 8,
        });
        assert_eq!(
            error.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_CAPACITY")
        );
        assert_eq!(error.details(), Some(json!({ "required": 9, "available": 8 })));
    }

    #[test]
    fn allocation_failures_are_server_errors() {
        let conflict = Error::from(AllocationError::SeatConflict {
            row: "1A".into(),
            seat: 3,
            detail: "is assigned twice".into(),
        });
        assert_eq!(conflict.status_and_code(), (StatusCode::CONFLICT, "SEAT_CONFLICT"));

        let failed = Error::from(AllocationError::AllocationFailed("rows exhausted".into()));
        assert_eq!(
            failed.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "ALLOCATION_FAILED")
        );
    }

    #[test]
    fn upstream_sheet_failures_are_bad_gateway() {
        assert_eq!(
            Error::from(SheetError::Status(404)).status_and_code().0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::from(SheetError::NotEnoughData).status_and_code().0,
            StatusCode::BAD_REQUEST
        );
    }
}
