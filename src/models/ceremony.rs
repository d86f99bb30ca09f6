//! Graduation ceremonies: the courses taking part, how many graduates each
//! brings, and the status lifecycle that gates allocation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::RecordError;
use crate::models::activatable::{ActiveState, Activatable};
use crate::models::demand::CategoryDemand;
use crate::models::venue::Venue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeremonyStatus {
    Planning,
    Confirmed,
    Completed,
    Cancelled,
}

impl CeremonyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CeremonyStatus::Planning => "planning",
            CeremonyStatus::Confirmed => "confirmed",
            CeremonyStatus::Completed => "completed",
            CeremonyStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CeremonyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CeremonyStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(CeremonyStatus::Planning),
            "confirmed" => Ok(CeremonyStatus::Confirmed),
            "completed" => Ok(CeremonyStatus::Completed),
            "cancelled" => Ok(CeremonyStatus::Cancelled),
            other => Err(RecordError::invalid("status", format!("unknown status `{other}`"))),
        }
    }
}

/// One course taking part in a ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeremonyCourse {
    pub category_id: Uuid,
    pub graduates: u32,
}

impl CeremonyCourse {
    /// Seats needed: each graduate plus their companions.
    pub fn seats(&self, seats_per_graduate: u32) -> u32 {
        self.graduates.saturating_mul(seats_per_graduate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ceremony {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub venue_id: Uuid,
    courses: Vec<CeremonyCourse>,
    pub notes: Option<String>,
    status: CeremonyStatus,
    allocation_generated: bool,
    pub state: ActiveState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ceremony {
    pub fn new(name: &str, date: NaiveDate, venue_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            date,
            venue_id,
            courses: Vec::new(),
            notes: None,
            status: CeremonyStatus::Planning,
            allocation_generated: false,
            state: ActiveState::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a ceremony from persisted parts, re-validating its courses.
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: Uuid,
        name: String,
        date: NaiveDate,
        venue_id: Uuid,
        courses: Vec<CeremonyCourse>,
        notes: Option<String>,
        status: CeremonyStatus,
        allocation_generated: bool,
        state: ActiveState,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        let mut ceremony = Self {
            id,
            name,
            date,
            venue_id,
            courses: Vec::with_capacity(courses.len()),
            notes,
            status,
            allocation_generated,
            state,
            created_at,
            updated_at,
        };
        for course in courses {
            ceremony.add_course(course.category_id, course.graduates)?;
        }
        Ok(ceremony)
    }

    pub fn courses(&self) -> &[CeremonyCourse] {
        &self.courses
    }

    pub fn status(&self) -> CeremonyStatus {
        self.status
    }

    pub fn allocation_generated(&self) -> bool {
        self.allocation_generated
    }

    pub fn add_course(&mut self, category_id: Uuid, graduates: u32) -> Result<(), RecordError> {
        if self.course(category_id).is_some() {
            return Err(RecordError::invalid(
                "courses",
                format!("course {category_id} is already part of this ceremony"),
            ));
        }
        if graduates == 0 {
            return Err(RecordError::invalid("graduates", "must be greater than zero"));
        }
        self.courses.push(CeremonyCourse { category_id, graduates });
        Ok(())
    }

    pub fn remove_course(&mut self, category_id: Uuid) -> usize {
        let before = self.courses.len();
        self.courses.retain(|c| c.category_id != category_id);
        before - self.courses.len()
    }

    pub fn update_course(&mut self, category_id: Uuid, graduates: u32) -> Result<(), RecordError> {
        if graduates == 0 {
            return Err(RecordError::invalid("graduates", "must be greater than zero"));
        }
        let course = self
            .courses
            .iter_mut()
            .find(|c| c.category_id == category_id)
            .ok_or_else(|| {
                RecordError::invalid("courses", format!("course {category_id} is not part of this ceremony"))
            })?;
        course.graduates = graduates;
        Ok(())
    }

    pub fn course(&self, category_id: Uuid) -> Option<&CeremonyCourse> {
        self.courses.iter().find(|c| c.category_id == category_id)
    }

    pub fn total_graduates(&self) -> u32 {
        self.courses
            .iter()
            .fold(0u32, |acc, c| acc.saturating_add(c.graduates))
    }

    pub fn required_seats(&self, seats_per_graduate: u32) -> u32 {
        self.courses
            .iter()
            .fold(0u32, |acc, c| acc.saturating_add(c.seats(seats_per_graduate)))
    }

    /// The allocation request for this ceremony, in course order.
    pub fn demands(&self, seats_per_graduate: u32) -> Vec<CategoryDemand> {
        self.courses
            .iter()
            .map(|c| CategoryDemand::new(c.category_id.to_string(), c.seats(seats_per_graduate)))
            .collect()
    }

    pub fn can_generate_allocation(&self) -> bool {
        !self.courses.is_empty()
            && matches!(self.status, CeremonyStatus::Planning | CeremonyStatus::Confirmed)
    }

    pub fn fits_in(&self, venue: &Venue, seats_per_graduate: u32) -> bool {
        venue.has_capacity_for(self.required_seats(seats_per_graduate))
    }

    pub fn confirm(&mut self) -> Result<(), RecordError> {
        self.transition(CeremonyStatus::Confirmed, &[CeremonyStatus::Planning])
    }

    pub fn complete(&mut self) -> Result<(), RecordError> {
        self.transition(CeremonyStatus::Completed, &[CeremonyStatus::Confirmed])
    }

    pub fn cancel(&mut self) -> Result<(), RecordError> {
        self.transition(
            CeremonyStatus::Cancelled,
            &[CeremonyStatus::Planning, CeremonyStatus::Confirmed],
        )?;
        self.allocation_generated = false;
        Ok(())
    }

    pub fn mark_allocation_generated(&mut self) {
        self.allocation_generated = true;
    }

    // repeating the current status is a no-op
    fn transition(&mut self, to: CeremonyStatus, from: &[CeremonyStatus]) -> Result<(), RecordError> {
        if self.status == to {
            return Ok(());
        }
        if !from.contains(&self.status) {
            return Err(RecordError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if !(3..=150).contains(&self.name.chars().count()) {
            return Err(RecordError::invalid("name", "must be between 3 and 150 characters"));
        }
        if let Some(notes) = &self.notes {
            if notes.chars().count() > 1000 {
                return Err(RecordError::invalid("notes", "must be at most 1000 characters"));
            }
        }
        if self.courses.is_empty() {
            return Err(RecordError::invalid("courses", "a ceremony needs at least one course"));
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Wire shape of a ceremony with its derived seat counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CeremonySummary {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub venue_id: Uuid,
    pub status: CeremonyStatus,
    pub courses: Vec<CeremonyCourse>,
    pub notes: Option<String>,
    pub total_graduates: u32,
    pub required_seats: u32,
    pub allocation_generated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ceremony {
    pub fn summary(&self, seats_per_graduate: u32) -> CeremonySummary {
        CeremonySummary {
            id: self.id,
            name: self.name.clone(),
            date: self.date,
            venue_id: self.venue_id,
            status: self.status,
            courses: self.courses.clone(),
            notes: self.notes.clone(),
            total_graduates: self.total_graduates(),
            required_seats: self.required_seats(seats_per_graduate),
            allocation_generated: self.allocation_generated,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Activatable for Ceremony {
    fn active_state(&self) -> &ActiveState {
        &self.state
    }

    fn active_state_mut(&mut self) -> &mut ActiveState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ceremony() -> Ceremony {
        Ceremony::new(
            "Graduation FAMED",
            NaiveDate::from_ymd_opt(2025, 8, 26).unwrap(),
            Uuid::new_v4(),
        )
    }

    #[test]
    fn huge_course_sizes_saturate_instead_of_overflowing() {
        let mut c = ceremony();
        c.add_course(Uuid::new_v4(), 3_000_000_000).unwrap();
        c.add_course(Uuid::new_v4(), 3_000_000_000).unwrap();

        let summary = c.summary(2);
        assert_eq!(summary.total_graduates, u32::MAX);
        assert_eq!(summary.required_seats, u32::MAX);
    }

    #[test]
    fn demands_follow_course_order_and_companion_seats() {
        let (med, law) = (Uuid::new_v4(), Uuid::new_v4());
        let mut c = ceremony();
        c.add_course(med, 2).unwrap();
        c.add_course(law, 3).unwrap();

        assert_eq!(c.total_graduates(), 5);
        assert_eq!(c.required_seats(2), 10);
        assert_eq!(
            c.demands(2),
            vec![
                CategoryDemand::new(med.to_string(), 4),
                CategoryDemand::new(law.to_string(), 6),
            ]
        );
    }

    #[test]
    fn course_edits_are_validated() {
        let med = Uuid::new_v4();
        let mut c = ceremony();
        c.add_course(med, 2).unwrap();

        assert!(c.add_course(med, 4).is_err());
        assert!(c.add_course(Uuid::new_v4(), 0).is_err());
        assert!(c.update_course(med, 0).is_err());
        assert!(c.update_course(Uuid::new_v4(), 3).is_err());

        c.update_course(med, 7).unwrap();
        assert_eq!(c.course(med).unwrap().graduates, 7);

        assert_eq!(c.remove_course(med), 1);
        assert_eq!(c.remove_course(med), 0);
        assert!(!c.can_generate_allocation());
    }

    #[test]
    fn lifecycle_gates_allocation() {
        let mut c = ceremony();
        c.add_course(Uuid::new_v4(), 1).unwrap();
        assert!(c.can_generate_allocation());

        assert!(c.complete().is_err());
        c.confirm().unwrap();
        c.confirm().unwrap();
        assert!(c.can_generate_allocation());

        c.mark_allocation_generated();
        c.cancel().unwrap();
        assert_eq!(c.status(), CeremonyStatus::Cancelled);
        assert!(!c.allocation_generated());
        assert!(!c.can_generate_allocation());
        assert!(matches!(c.confirm(), Err(RecordError::InvalidTransition { .. })));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            CeremonyStatus::Planning,
            CeremonyStatus::Confirmed,
            CeremonyStatus::Completed,
            CeremonyStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<CeremonyStatus>().unwrap(), status);
        }
        assert!("archived".parse::<CeremonyStatus>().is_err());
    }

    #[test]
    fn capacity_check_uses_required_seats() {
        let mut venue = Venue::new("Main Hall", None);
        venue.add_row("1A", 5, None).unwrap();
        let mut c = ceremony();
        c.add_course(Uuid::new_v4(), 2).unwrap();
        assert!(c.fits_in(&venue, 2));
        c.add_course(Uuid::new_v4(), 1).unwrap();
        assert!(!c.fits_in(&venue, 2));
    }

    #[test]
    fn validate_requires_courses() {
        let mut c = ceremony();
        assert!(c.validate().is_err());
        c.add_course(Uuid::new_v4(), 1).unwrap();
        assert!(c.validate().is_ok());
    }
}
