//! Sequential first-fit seat allocation.
//!
//! Demands are seated strictly in input order. A cursor walks the rows in the
//! order given and only ever moves forward: each demand takes the seats left
//! in the current row, then continues at seat 1 of the next row, until its
//! count is met. Every contiguous reservation inside one row becomes its own
//! [`SeatBlock`]. The computation is pure; the same inputs always produce the
//! same block sequence.

use std::collections::HashSet;

use crate::error::AllocationError;
use crate::models::allocation::{Allocation, SeatBlock};
use crate::models::demand::{total_seats, CategoryDemand};
use crate::models::venue::Row;

/// Position of the next free seat: row index and 1-based seat number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SeatCursor {
    row: usize,
    seat: u32,
}

impl SeatCursor {
    fn start() -> Self {
        Self { row: 0, seat: 1 }
    }

    fn next_row(&mut self) {
        self.row += 1;
        self.seat = 1;
    }
}

/// Seats `demands` into `rows`, which must already be in canonical order
/// (see [`crate::models::venue::Venue::ordered_rows`]).
///
/// Fails without producing anything when a demand is malformed, when the
/// demands exceed the layout's capacity, or if the rows run out mid-demand.
pub fn allocate(rows: &[Row], demands: &[CategoryDemand]) -> Result<Allocation, AllocationError> {
    validate_demands(demands)?;

    let required = total_seats(demands);
    let available = rows
        .iter()
        .fold(0u32, |acc, r| acc.saturating_add(r.capacity()));
    if rows.is_empty() || required > available {
        return Err(AllocationError::InsufficientCapacity { required, available });
    }

    let mut cursor = SeatCursor::start();
    let mut blocks = Vec::with_capacity(demands.len() + rows.len());

    for demand in demands {
        let mut remaining = demand.seats;

        while remaining > 0 {
            let Some(row) = rows.get(cursor.row) else {
                return Err(AllocationError::AllocationFailed(format!(
                    "rows exhausted with {remaining} seats still needed for `{}`",
                    demand.category
                )));
            };

            let left_in_row = row.capacity().saturating_add(1).saturating_sub(cursor.seat);
            if left_in_row == 0 {
                cursor.next_row();
                continue;
            }

            let take = remaining.min(left_in_row);
            blocks.push(SeatBlock::run(&demand.category, row.code(), cursor.seat, take));
            remaining -= take;
            cursor.seat += take;

            if cursor.seat > row.capacity() {
                cursor.next_row();
            }
        }
    }

    tracing::debug!(
        categories = demands.len(),
        seats = required,
        capacity = available,
        blocks = blocks.len(),
        "seat allocation computed"
    );

    Ok(Allocation::from_parts(rows.to_vec(), demands.to_vec(), blocks))
}

fn validate_demands(demands: &[CategoryDemand]) -> Result<(), AllocationError> {
    if demands.is_empty() {
        return Err(AllocationError::InvalidDemand(
            "at least one category demand is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(demands.len());
    for d in demands {
        if d.category.trim().is_empty() {
            return Err(AllocationError::InvalidDemand(
                "category identity must not be empty".to_string(),
            ));
        }
        if d.seats == 0 {
            return Err(AllocationError::InvalidDemand(format!(
                "`{}` must request at least one seat",
                d.category
            )));
        }
        if !seen.insert(d.category.as_str()) {
            return Err(AllocationError::InvalidDemand(format!(
                "category `{}` appears more than once",
                d.category
            )));
        }
    }
    Ok(())
}
