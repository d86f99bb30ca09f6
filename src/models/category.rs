use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::RecordError;
use crate::models::activatable::{ActiveState, Activatable};

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color pattern is valid"));

/// A group seated together, e.g. one graduating course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub abbreviation: Option<String>,
    pub color: Option<String>,
    #[serde(flatten)]
    pub state: ActiveState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(
        name: &str,
        abbreviation: Option<&str>,
        color: Option<&str>,
    ) -> Result<Self, RecordError> {
        let now = Utc::now();
        let category = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            abbreviation: abbreviation
                .map(|a| a.trim().to_uppercase())
                .filter(|a| !a.is_empty()),
            color: color.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            state: ActiveState::new(),
            created_at: now,
            updated_at: now,
        };
        category.validate()?;
        Ok(category)
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        let name_len = self.name.chars().count();
        if !(3..=100).contains(&name_len) {
            return Err(RecordError::invalid(
                "name",
                "must be between 3 and 100 characters",
            ));
        }
        if let Some(abbreviation) = &self.abbreviation {
            if !(2..=5).contains(&abbreviation.chars().count()) {
                return Err(RecordError::invalid(
                    "abbreviation",
                    "must be between 2 and 5 characters",
                ));
            }
        }
        if let Some(color) = &self.color {
            if !HEX_COLOR.is_match(color) {
                return Err(RecordError::invalid(
                    "color",
                    "must be a hex color such as #ffcc00",
                ));
            }
        }
        Ok(())
    }
}

impl Activatable for Category {
    fn active_state(&self) -> &ActiveState {
        &self.state
    }

    fn active_state_mut(&mut self) -> &mut ActiveState {
        &mut self.state
    }
}
