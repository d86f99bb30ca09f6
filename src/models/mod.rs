pub mod activatable;
pub mod allocation;
pub mod category;
pub mod ceremony;
pub mod demand;
pub mod venue;

pub use activatable::{Activatable, ActiveState};
pub use allocation::{Allocation, CategorySummary, FreeSeats, RowUsage, SeatBlock};
pub use category::Category;
pub use ceremony::{Ceremony, CeremonyCourse, CeremonyStatus, CeremonySummary};
pub use demand::CategoryDemand;
pub use venue::{Row, RowDistribution, Venue, VenueSummary};
