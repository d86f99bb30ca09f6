use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Soft-delete bookkeeping carried by stored entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveState {
    pub active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActiveState {
    pub fn new() -> Self {
        Self { active: true, deleted_at: None }
    }
}

impl Default for ActiveState {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability of entities that can be logically deleted and restored.
///
/// The allocation engine never sees this: storage queries only hand it
/// entities that are still active.
pub trait Activatable {
    fn active_state(&self) -> &ActiveState;
    fn active_state_mut(&mut self) -> &mut ActiveState;

    fn is_active(&self) -> bool {
        self.active_state().active
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.active_state().deleted_at
    }

    fn soft_delete(&mut self, at: DateTime<Utc>) {
        let state = self.active_state_mut();
        state.active = false;
        state.deleted_at = Some(at);
    }

    fn restore(&mut self) {
        let state = self.active_state_mut();
        state.active = true;
        state.deleted_at = None;
    }
}
