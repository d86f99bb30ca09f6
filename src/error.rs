//! Error taxonomy shared by the layout model, the allocation engine and the
//! service layer.

use thiserror::Error;

use crate::services::sheet::SheetError;
use crate::store::StoreError;

/// Failures raised while building or editing a venue's row layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("invalid row `{code}`: {reason}")]
    InvalidRow { code: String, reason: String },

    #[error("row `{0}` already exists in this venue")]
    DuplicateRow(String),

    #[error("row `{0}` not found")]
    RowNotFound(String),

    #[error("invalid venue: {0}")]
    InvalidVenue(String),
}

impl LayoutError {
    pub(crate) fn invalid_row(code: &str, reason: impl Into<String>) -> Self {
        LayoutError::InvalidRow {
            code: code.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures raised by the allocation engine and by allocation verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("invalid demand: {0}")]
    InvalidDemand(String),

    #[error("insufficient capacity: {required} seats required, {available} available")]
    InsufficientCapacity { required: u32, available: u32 },

    #[error("seat {seat} in row `{row}` {detail}")]
    SeatConflict { row: String, seat: u32, detail: String },

    #[error("allocation failed: {0}")]
    AllocationFailed(String),
}

/// Field-level validation failures and lifecycle violations on stored records
/// (categories and ceremonies).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("cannot move from `{from}` to `{to}`")]
    InvalidTransition { from: String, to: String },
}

impl RecordError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        RecordError::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Top-level error for the service layer; every variant maps to a distinct
/// HTTP status in `controllers::error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
