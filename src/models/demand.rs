use serde::{Deserialize, Serialize};

/// One category's seat requirement within an allocation request. A request
/// is an ordered `Vec<CategoryDemand>`: the first entry is seated first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryDemand {
    pub category: String,
    pub seats: u32,
}

impl CategoryDemand {
    pub fn new(category: impl Into<String>, seats: u32) -> Self {
        Self {
            category: category.into(),
            seats,
        }
    }
}

/// Sum of all requested seats, saturating on overflow.
pub fn total_seats(demands: &[CategoryDemand]) -> u32 {
    demands
        .iter()
        .fold(0u32, |acc, d| acc.saturating_add(d.seats))
}
