//! Venue layout model: rows of sequentially numbered seats and the canonical
//! row order the allocation engine walks.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::LayoutError;
use crate::models::activatable::{ActiveState, Activatable};

pub const MIN_ROW_SEATS: u32 = 1;
pub const MAX_ROW_SEATS: u32 = 100;
pub const MAX_ROW_CODE_LEN: usize = 10;

const VENUE_NAME_MIN: usize = 3;
const VENUE_NAME_MAX: usize = 100;
const VENUE_DESCRIPTION_MAX: usize = 500;

// number + single letter, e.g. "1A", "12C"
static ROW_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)([A-Z])$").expect("row code pattern is valid"));

/// Normalizes a row code the way it is stored: trimmed, upper case.
pub fn normalize_row_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Deterministic ordering key of a row code: `(number - 1) * 26 + letter`,
/// where `A` is 1. Returns `None` for codes that do not match the
/// number+letter pattern or whose number is zero.
pub fn row_order_key(code: &str) -> Option<u32> {
    let code = normalize_row_code(code);
    let caps = ROW_CODE.captures(&code)?;
    let number: u32 = caps[1].parse().ok()?;
    let letter = caps[2].chars().next()? as u32 - 'A' as u32 + 1;

    number.checked_sub(1)?.checked_mul(26)?.checked_add(letter)
}

/// A named block of seats numbered `1..=capacity`.
///
/// Deserialization goes through [`Row::new`], so stored snapshots and cache
/// payloads obey the same rules as fresh input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRow")]
pub struct Row {
    code: String,
    capacity: u32,
    order: u32,
}

impl Row {
    /// Validates and builds a row. The code is normalized, and the ordering
    /// key is derived from it when `order` is omitted.
    pub fn new(code: &str, capacity: u32, order: Option<u32>) -> Result<Self, LayoutError> {
        let code = normalize_row_code(code);

        if code.len() > MAX_ROW_CODE_LEN {
            return Err(LayoutError::invalid_row(
                &code,
                format!("code must be at most {MAX_ROW_CODE_LEN} characters"),
            ));
        }
        if !ROW_CODE.is_match(&code) {
            return Err(LayoutError::invalid_row(
                &code,
                "code must be a number followed by a letter (e.g. 1A, 2B)",
            ));
        }
        // the pattern matched, so everything before the letter is digits
        if code[..code.len() - 1].bytes().all(|b| b == b'0') {
            return Err(LayoutError::invalid_row(&code, "row number must start at 1"));
        }

        if !(MIN_ROW_SEATS..=MAX_ROW_SEATS).contains(&capacity) {
            return Err(LayoutError::invalid_row(
                &code,
                format!("capacity must be between {MIN_ROW_SEATS} and {MAX_ROW_SEATS}"),
            ));
        }
        let order = match order {
            Some(0) => return Err(LayoutError::invalid_row(&code, "order must be at least 1")),
            Some(order) => order,
            None => row_order_key(&code).ok_or_else(|| {
                LayoutError::invalid_row(&code, "row number is too large to derive an order")
            })?,
        };

        Ok(Self {
            code,
            capacity,
            order,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// Explicit order if one was given, otherwise the key derived from the code.
    pub fn ordering_key(&self) -> u32 {
        self.order
    }

    pub fn matches(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }
}

#[derive(Deserialize)]
struct RawRow {
    code: String,
    capacity: u32,
    #[serde(default)]
    order: Option<u32>,
}

impl TryFrom<RawRow> for Row {
    type Error = LayoutError;

    fn try_from(raw: RawRow) -> Result<Self, Self::Error> {
        Row::new(&raw.code, raw.capacity, raw.order)
    }
}

/// Seats-per-row statistics of a venue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDistribution {
    pub total_rows: usize,
    pub total_seats: u32,
    pub mean_seats_per_row: f64,
    pub smallest_row: u32,
    pub largest_row: u32,
    /// Rows by descending capacity; ties keep layout order.
    pub rows_by_size: Vec<RowSize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSize {
    pub code: String,
    pub capacity: u32,
}

/// A venue and its row layout.
///
/// Rows are only reachable through the mutation methods below, all of which
/// validate before touching state, so an invalid row is never observable.
#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    rows: Vec<Row>,
    pub state: ActiveState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Venue {
    pub fn new(name: &str, description: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            rows: Vec::new(),
            state: ActiveState::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a venue from persisted parts, re-validating every row.
    pub fn from_stored(
        id: Uuid,
        name: String,
        description: Option<String>,
        rows: Vec<Row>,
        state: ActiveState,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, LayoutError> {
        let mut venue = Self {
            id,
            name,
            description,
            rows: Vec::with_capacity(rows.len()),
            state,
            created_at,
            updated_at,
        };
        for row in rows {
            venue.add_row(row.code(), row.capacity(), Some(row.order()))?;
        }
        venue.sort_rows();
        Ok(venue)
    }

    /// Rows in the order they were added or last sorted.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, code: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.matches(code))
    }

    pub fn add_row(
        &mut self,
        code: &str,
        capacity: u32,
        order: Option<u32>,
    ) -> Result<&Row, LayoutError> {
        if self.row(code).is_some() {
            return Err(LayoutError::DuplicateRow(normalize_row_code(code)));
        }
        let row = Row::new(code, capacity, order)?;
        self.rows.push(row);
        Ok(&self.rows[self.rows.len() - 1])
    }

    /// Removes every row matching `code`; returns how many were removed.
    pub fn remove_row(&mut self, code: &str) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| !r.matches(code));
        before - self.rows.len()
    }

    /// Changes capacity and/or order of an existing row. On validation
    /// failure the row is left untouched.
    pub fn update_row(
        &mut self,
        code: &str,
        capacity: Option<u32>,
        order: Option<u32>,
    ) -> Result<&Row, LayoutError> {
        let idx = self
            .rows
            .iter()
            .position(|r| r.matches(code))
            .ok_or_else(|| LayoutError::RowNotFound(normalize_row_code(code)))?;

        let current = &self.rows[idx];
        let updated = Row::new(
            &current.code,
            capacity.unwrap_or(current.capacity),
            Some(order.unwrap_or(current.order)),
        )?;
        self.rows[idx] = updated;
        Ok(&self.rows[idx])
    }

    /// Canonical row sequence: stable ascending sort by ordering key.
    pub fn ordered_rows(&self) -> Vec<Row> {
        let mut rows = self.rows.clone();
        rows.sort_by_key(Row::ordering_key);
        rows
    }

    /// Puts the stored rows in canonical order; done before every save.
    pub fn sort_rows(&mut self) {
        self.rows.sort_by_key(Row::ordering_key);
    }

    pub fn total_capacity(&self) -> u32 {
        self.rows.iter().map(Row::capacity).sum()
    }

    pub fn has_capacity_for(&self, seats: u32) -> bool {
        self.total_capacity() >= seats
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row_distribution(&self) -> Option<RowDistribution> {
        let smallest_row = self.rows.iter().map(Row::capacity).min()?;
        let largest_row = self.rows.iter().map(Row::capacity).max()?;
        let total_seats = self.total_capacity();

        let mut rows_by_size: Vec<RowSize> = self
            .rows
            .iter()
            .map(|r| RowSize { code: r.code.clone(), capacity: r.capacity })
            .collect();
        rows_by_size.sort_by(|a, b| b.capacity.cmp(&a.capacity));

        Some(RowDistribution {
            total_rows: self.rows.len(),
            total_seats,
            mean_seats_per_row: f64::from(total_seats) / self.rows.len() as f64,
            smallest_row,
            largest_row,
            rows_by_size,
        })
    }

    /// Whole-aggregate check run before persisting.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let name_len = self.name.chars().count();
        if !(VENUE_NAME_MIN..=VENUE_NAME_MAX).contains(&name_len) {
            return Err(LayoutError::InvalidVenue(format!(
                "name must be between {VENUE_NAME_MIN} and {VENUE_NAME_MAX} characters"
            )));
        }
        if let Some(description) = &self.description {
            if description.chars().count() > VENUE_DESCRIPTION_MAX {
                return Err(LayoutError::InvalidVenue(format!(
                    "description must be at most {VENUE_DESCRIPTION_MAX} characters"
                )));
            }
        }
        if self.rows.is_empty() {
            return Err(LayoutError::InvalidVenue(
                "a venue needs at least one row".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.rows.len());
        for row in &self.rows {
            if !seen.insert(row.code.as_str()) {
                return Err(LayoutError::DuplicateRow(row.code.clone()));
            }
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Activatable for Venue {
    fn active_state(&self) -> &ActiveState {
        &self.state
    }

    fn active_state_mut(&mut self) -> &mut ActiveState {
        &mut self.state
    }
}

/// Wire and cache shape of a venue, rows in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub rows: Vec<Row>,
    pub total_rows: usize,
    pub total_capacity: u32,
    #[serde(flatten)]
    pub state: ActiveState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Venue> for VenueSummary {
    fn from(venue: &Venue) -> Self {
        Self {
            id: venue.id,
            name: venue.name.clone(),
            description: venue.description.clone(),
            rows: venue.ordered_rows(),
            total_rows: venue.total_rows(),
            total_capacity: venue.total_capacity(),
            state: venue.state,
            created_at: venue.created_at,
            updated_at: venue.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue_with(rows: &[(&str, u32)]) -> Venue {
        let mut venue = Venue::new("Main Hall", None);
        for (code, capacity) in rows {
            venue.add_row(code, *capacity, None).unwrap();
        }
        venue
    }

    fn codes(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(Row::code).collect()
    }

    #[test]
    fn order_key_follows_number_and_letter() {
        assert_eq!(row_order_key("1A"), Some(1));
        assert_eq!(row_order_key("1Z"), Some(26));
        assert_eq!(row_order_key("2A"), Some(27));
        assert_eq!(row_order_key("10B"), Some(236));
        assert_eq!(row_order_key(" 10b "), Some(236));
        assert_eq!(row_order_key("0A"), None);
        assert_eq!(row_order_key("A1"), None);
        assert_eq!(row_order_key("99999999999A"), None);
    }

    #[test]
    fn row_code_is_normalized() {
        let row = Row::new(" 3c ", 10, None).unwrap();
        assert_eq!(row.code(), "3C");
        assert_eq!(row.order(), 55);
    }

    #[test]
    fn row_rejects_bad_code_and_capacity() {
        for code in ["", "A", "1", "1AB", "A1", "0A", "1-A", "12345678901A"] {
            assert!(
                matches!(Row::new(code, 10, None), Err(LayoutError::InvalidRow { .. })),
                "{code:?} should be rejected"
            );
        }
        assert!(matches!(Row::new("1A", 0, None), Err(LayoutError::InvalidRow { .. })));
        assert!(matches!(Row::new("1A", 101, None), Err(LayoutError::InvalidRow { .. })));
        assert!(matches!(Row::new("1A", 5, Some(0)), Err(LayoutError::InvalidRow { .. })));
        assert!(Row::new("1A", 100, Some(7)).is_ok());
    }

    #[test]
    fn large_row_numbers_need_an_explicit_order() {
        let err = Row::new("200000000A", 10, None).unwrap_err();
        assert_eq!(
            err,
            LayoutError::invalid_row("200000000A", "row number is too large to derive an order")
        );
        let row = Row::new("200000000A", 10, Some(3)).unwrap();
        assert_eq!(row.ordering_key(), 3);

        assert_eq!(
            Row::new("00A", 10, Some(3)).unwrap_err(),
            LayoutError::invalid_row("00A", "row number must start at 1")
        );
    }

    #[test]
    fn deserialized_rows_are_validated() {
        let row: Row = serde_json::from_str(r#"{"code":"2b","capacity":4}"#).unwrap();
        assert_eq!(row, Row::new("2B", 4, None).unwrap());

        for json in [
            r#"{"code":"1A","capacity":0}"#,
            r#"{"code":"A1","capacity":4}"#,
            r#"{"code":"1A","capacity":4,"order":0}"#,
        ] {
            assert!(serde_json::from_str::<Row>(json).is_err(), "{json} should be rejected");
        }
    }

    #[test]
    fn add_row_rejects_duplicates_case_insensitively() {
        let mut venue = venue_with(&[("1A", 5)]);
        assert_eq!(
            venue.add_row("1a", 3, None).unwrap_err(),
            LayoutError::DuplicateRow("1A".to_string())
        );
        assert_eq!(venue.total_rows(), 1);
    }

    #[test]
    fn invalid_row_never_lands_in_the_layout() {
        let mut venue = venue_with(&[("1A", 5)]);
        assert!(venue.add_row("2B", 500, None).is_err());
        assert_eq!(codes(venue.rows()), vec!["1A"]);
    }

    #[test]
    fn remove_row_is_idempotent() {
        let mut venue = venue_with(&[("1A", 5), ("1B", 3)]);
        assert_eq!(venue.remove_row("1b"), 1);
        assert_eq!(venue.remove_row("1B"), 0);
        assert_eq!(codes(venue.rows()), vec!["1A"]);
    }

    #[test]
    fn update_row_revalidates_and_keeps_old_value_on_failure() {
        let mut venue = venue_with(&[("1A", 5)]);

        assert_eq!(
            venue.update_row("9Z", Some(3), None).unwrap_err(),
            LayoutError::RowNotFound("9Z".to_string())
        );

        let updated = venue.update_row("1a", Some(8), None).unwrap();
        assert_eq!(updated.capacity(), 8);
        assert_eq!(updated.order(), 1);

        assert!(venue.update_row("1A", Some(0), None).is_err());
        assert_eq!(venue.row("1A").unwrap().capacity(), 8);

        venue.update_row("1A", None, Some(40)).unwrap();
        assert_eq!(venue.row("1A").unwrap().ordering_key(), 40);
    }

    #[test]
    fn ordered_rows_sort_by_key_and_are_stable() {
        let mut venue = venue_with(&[("10B", 4), ("2A", 4), ("1A", 4)]);
        assert_eq!(codes(&venue.ordered_rows()), vec!["1A", "2A", "10B"]);

        // two rows sharing an explicit order keep insertion order
        venue.add_row("3A", 4, Some(27)).unwrap();
        assert_eq!(codes(&venue.ordered_rows()), vec!["1A", "2A", "3A", "10B"]);

        // reads do not reorder the stored layout
        assert_eq!(codes(venue.rows()), vec!["10B", "2A", "1A", "3A"]);
        venue.sort_rows();
        assert_eq!(codes(venue.rows()), vec!["1A", "2A", "3A", "10B"]);
    }

    #[test]
    fn row_without_explicit_order_falls_back_to_code() {
        let row: Row = serde_json::from_str(r#"{"code":"2B","capacity":4}"#).unwrap();
        assert_eq!(row.order(), 28);
        assert_eq!(row.ordering_key(), 28);
    }

    #[test]
    fn capacity_queries() {
        let venue = venue_with(&[("1A", 5), ("1B", 3)]);
        assert_eq!(venue.total_capacity(), 8);
        assert!(venue.has_capacity_for(8));
        assert!(!venue.has_capacity_for(9));
    }

    #[test]
    fn distribution_reports_extremes_and_sizes() {
        let venue = venue_with(&[("1A", 5), ("1B", 3), ("1C", 5)]);
        let dist = venue.row_distribution().unwrap();

        assert_eq!(dist.total_rows, 3);
        assert_eq!(dist.total_seats, 13);
        assert_eq!(dist.smallest_row, 3);
        assert_eq!(dist.largest_row, 5);
        assert!((dist.mean_seats_per_row - 13.0 / 3.0).abs() < f64::EPSILON);
        let sizes: Vec<&str> = dist.rows_by_size.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(sizes, vec!["1A", "1C", "1B"]);

        assert!(Venue::new("Empty", None).row_distribution().is_none());
    }

    #[test]
    fn validate_requires_name_and_rows() {
        assert!(matches!(
            Venue::new("Hall", None).validate(),
            Err(LayoutError::InvalidVenue(_))
        ));
        assert!(matches!(
            venue_with(&[]).validate(),
            Err(LayoutError::InvalidVenue(_))
        ));

        let mut short = venue_with(&[("1A", 5)]);
        short.name = "Hi".into();
        assert!(short.validate().is_err());

        assert!(venue_with(&[("1A", 5)]).validate().is_ok());
    }

    #[test]
    fn from_stored_rejects_corrupt_rows() {
        let rows: Vec<Row> =
            serde_json::from_str(r#"[{"code":"1A","capacity":5},{"code":"1a","capacity":2}]"#)
                .unwrap();
        let now = Utc::now();
        let err = Venue::from_stored(
            Uuid::new_v4(),
            "Main Hall".into(),
            None,
            rows,
            ActiveState::new(),
            now,
            now,
        )
        .unwrap_err();
        assert_eq!(err, LayoutError::DuplicateRow("1A".into()));
    }
}
