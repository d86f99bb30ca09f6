pub mod allocation;
pub mod seating;
pub mod sheet;

pub use allocation::allocate;
pub use seating::{AllocationReport, ImportOutcome, SeatingService};
pub use sheet::{SheetData, SheetImporter};
