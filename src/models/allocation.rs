//! Seat blocks and the allocation value produced by the engine, plus the
//! read-side queries derived from it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::AllocationError;
use crate::models::demand::CategoryDemand;
use crate::models::venue::Row;

/// One reservation of seats in one row for one category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatBlock {
    category: String,
    row: String,
    seats: Vec<u32>,
}

impl SeatBlock {
    /// Builds a block from arbitrary seat numbers; they are sorted and
    /// de-duplicated. An empty seat list is rejected.
    pub fn new(
        category: impl Into<String>,
        row: impl Into<String>,
        mut seats: Vec<u32>,
    ) -> Result<Self, AllocationError> {
        let category = category.into();
        let row = row.into();
        if seats.is_empty() {
            return Err(AllocationError::AllocationFailed(format!(
                "block for `{category}` in row `{row}` has no seats"
            )));
        }
        seats.sort_unstable();
        seats.dedup();
        Ok(Self { category, row, seats })
    }

    /// `count` consecutive seats starting at `first`.
    pub(crate) fn run(category: &str, row: &str, first: u32, count: u32) -> Self {
        Self {
            category: category.to_string(),
            row: row.to_string(),
            seats: (first..first + count).collect(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn row(&self) -> &str {
        &self.row
    }

    pub fn seats(&self) -> &[u32] {
        &self.seats
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn first_seat(&self) -> Option<u32> {
        self.seats.first().copied()
    }

    pub fn last_seat(&self) -> Option<u32> {
        self.seats.last().copied()
    }

    /// `"5"` for a single seat, `"1-4"` for a contiguous run, otherwise the
    /// seat numbers joined with `", "`.
    pub fn range_label(&self) -> String {
        range_label(&self.seats)
    }
}

pub fn range_label(seats: &[u32]) -> String {
    match seats {
        [] => String::new(),
        [only] => only.to_string(),
        [first, .., last] if last.checked_sub(*first) == Some(seats.len() as u32 - 1) => {
            format!("{first}-{last}")
        }
        _ => seats
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowUsage {
    pub row: String,
    pub seats: usize,
    pub range: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total_seats: usize,
    pub rows: Vec<RowUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSeats {
    pub row: String,
    pub seats: Vec<u32>,
    pub count: usize,
}

/// The complete seat assignment for one venue layout and one ordered demand
/// list. Regeneration replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    rows: Vec<Row>,
    demands: Vec<CategoryDemand>,
    blocks: Vec<SeatBlock>,
}

impl Allocation {
    /// Assembles an allocation from its parts without checking it; callers
    /// accepting it for storage must run [`Allocation::verify`].
    pub fn from_parts(rows: Vec<Row>, demands: Vec<CategoryDemand>, blocks: Vec<SeatBlock>) -> Self {
        Self { rows, demands, blocks }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn demands(&self) -> &[CategoryDemand] {
        &self.demands
    }

    pub fn blocks(&self) -> &[SeatBlock] {
        &self.blocks
    }

    /// Checks that every seat exists in the layout and that no
    /// (row, seat) pair appears in more than one block.
    pub fn verify(&self) -> Result<(), AllocationError> {
        let capacities: HashMap<&str, u32> =
            self.rows.iter().map(|r| (r.code(), r.capacity())).collect();
        let mut owners: HashMap<(&str, u32), &str> = HashMap::new();

        for block in &self.blocks {
            let Some(&first) = block.seats.first() else {
                return Err(AllocationError::AllocationFailed(format!(
                    "block for `{}` in row `{}` has no seats",
                    block.category, block.row
                )));
            };
            let Some(&capacity) = capacities.get(block.row.as_str()) else {
                return Err(AllocationError::SeatConflict {
                    row: block.row.clone(),
                    seat: first,
                    detail: "belongs to a row that is not part of the venue".to_string(),
                });
            };

            for &seat in &block.seats {
                if seat == 0 || seat > capacity {
                    return Err(AllocationError::SeatConflict {
                        row: block.row.clone(),
                        seat,
                        detail: format!("is outside the row's 1-{capacity} range"),
                    });
                }
                if let Some(previous) = owners.insert((block.row.as_str(), seat), &block.category) {
                    let detail = if previous == block.category {
                        format!("is assigned twice to `{previous}`")
                    } else {
                        format!("is assigned to both `{previous}` and `{}`", block.category)
                    };
                    return Err(AllocationError::SeatConflict {
                        row: block.row.clone(),
                        seat,
                        detail,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn blocks_for_category(&self, category: &str) -> Vec<&SeatBlock> {
        self.blocks.iter().filter(|b| b.category == category).collect()
    }

    pub fn blocks_for_row(&self, code: &str) -> Vec<&SeatBlock> {
        let code = code.trim();
        self.blocks
            .iter()
            .filter(|b| b.row.eq_ignore_ascii_case(code))
            .collect()
    }

    /// Union of seat numbers taken in `code`, ascending.
    pub fn occupied_seats_in_row(&self, code: &str) -> Vec<u32> {
        self.blocks_for_row(code)
            .into_iter()
            .flat_map(|b| b.seats.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct categories in the order they were first seated.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for block in &self.blocks {
            if !seen.contains(&block.category.as_str()) {
                seen.push(block.category.as_str());
            }
        }
        seen
    }

    /// Distinct row codes in the order they were first used.
    pub fn rows_used(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for block in &self.blocks {
            if !seen.contains(&block.row.as_str()) {
                seen.push(block.row.as_str());
            }
        }
        seen
    }

    pub fn category_summary(&self) -> Vec<CategorySummary> {
        self.categories()
            .into_iter()
            .map(|category| {
                let blocks = self.blocks_for_category(category);
                CategorySummary {
                    category: category.to_string(),
                    total_seats: blocks.iter().map(|b| b.len()).sum(),
                    rows: blocks
                        .iter()
                        .map(|b| RowUsage {
                            row: b.row.clone(),
                            seats: b.len(),
                            range: b.range_label(),
                        })
                        .collect(),
                }
            })
            .collect()
    }

    pub fn total_allocated_seats(&self) -> usize {
        self.blocks.iter().map(SeatBlock::len).sum()
    }

    pub fn total_capacity(&self) -> u32 {
        self.rows.iter().map(Row::capacity).sum()
    }

    /// Allocated seats as a percentage of venue capacity; 0.0 for a venue
    /// without seats.
    pub fn occupancy_rate(&self) -> f64 {
        let capacity = self.total_capacity();
        if capacity == 0 {
            return 0.0;
        }
        self.total_allocated_seats() as f64 / f64::from(capacity) * 100.0
    }

    /// For every row of the layout, the seats no block occupies.
    pub fn free_seats_per_row(&self) -> Vec<FreeSeats> {
        self.rows
            .iter()
            .map(|row| {
                let occupied: BTreeSet<u32> =
                    self.occupied_seats_in_row(row.code()).into_iter().collect();
                let seats: Vec<u32> = (1..=row.capacity())
                    .filter(|seat| !occupied.contains(seat))
                    .collect();
                FreeSeats {
                    row: row.code().to_string(),
                    count: seats.len(),
                    seats,
                }
            })
            .collect()
    }

    /// row code -> seat number -> category.
    pub fn seat_map(&self) -> BTreeMap<String, BTreeMap<u32, String>> {
        let mut map: BTreeMap<String, BTreeMap<u32, String>> = BTreeMap::new();
        for block in &self.blocks {
            let row = map.entry(block.row.clone()).or_default();
            for &seat in &block.seats {
                row.insert(seat, block.category.clone());
            }
        }
        map
    }

    /// SHA-256 of the canonical JSON of the block sequence (compact, keys
    /// sorted), hex encoded.
    pub fn checksum(&self) -> String {
        let canonical: Vec<Value> = self
            .blocks
            .iter()
            .map(|b| json!({ "category": b.category, "row": b.row, "seats": b.seats }))
            .collect();
        hex::encode(Sha256::digest(Value::Array(canonical).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Row> {
        vec![Row::new("1A", 5, None).unwrap(), Row::new("1B", 3, None).unwrap()]
    }

    fn block(category: &str, row: &str, seats: &[u32]) -> SeatBlock {
        SeatBlock::new(category, row, seats.to_vec()).unwrap()
    }

    fn sample() -> Allocation {
        Allocation::from_parts(
            rows(),
            vec![CategoryDemand::new("MED", 4), CategoryDemand::new("LAW", 2)],
            vec![
                block("MED", "1A", &[1, 2, 3, 4]),
                block("LAW", "1A", &[5]),
                block("LAW", "1B", &[1]),
            ],
        )
    }

    #[test]
    fn range_label_renders_runs_and_lists() {
        assert_eq!(range_label(&[]), "");
        assert_eq!(range_label(&[7]), "7");
        assert_eq!(range_label(&[1, 2, 3, 4]), "1-4");
        assert_eq!(range_label(&[1, 3, 7]), "1, 3, 7");
    }

    #[test]
    fn seat_block_sorts_and_dedups() {
        let b = block("MED", "1A", &[3, 1, 2, 3]);
        assert_eq!(b.seats(), &[1, 2, 3]);
        assert_eq!(b.first_seat(), Some(1));
        assert_eq!(b.last_seat(), Some(3));
        assert_eq!(b.range_label(), "1-3");
        assert!(SeatBlock::new("MED", "1A", vec![]).is_err());
    }

    #[test]
    fn verify_accepts_disjoint_blocks() {
        assert_eq!(sample().verify(), Ok(()));
    }

    #[test]
    fn verify_flags_seat_shared_between_categories() {
        let allocation = Allocation::from_parts(
            rows(),
            vec![],
            vec![block("MED", "1A", &[1, 2]), block("LAW", "1A", &[2, 3])],
        );
        assert_eq!(
            allocation.verify(),
            Err(AllocationError::SeatConflict {
                row: "1A".into(),
                seat: 2,
                detail: "is assigned to both `MED` and `LAW`".into(),
            })
        );
    }

    #[test]
    fn verify_flags_repeat_within_one_category() {
        let allocation = Allocation::from_parts(
            rows(),
            vec![],
            vec![block("MED", "1B", &[1]), block("MED", "1B", &[1, 2])],
        );
        assert!(matches!(
            allocation.verify(),
            Err(AllocationError::SeatConflict { seat: 1, .. })
        ));
    }

    #[test]
    fn verify_flags_seats_outside_the_layout() {
        let beyond = Allocation::from_parts(rows(), vec![], vec![block("MED", "1B", &[3, 4])]);
        assert!(matches!(
            beyond.verify(),
            Err(AllocationError::SeatConflict { seat: 4, .. })
        ));

        let unknown = Allocation::from_parts(rows(), vec![], vec![block("MED", "9Z", &[1])]);
        assert!(matches!(
            unknown.verify(),
            Err(AllocationError::SeatConflict { .. })
        ));
    }

    #[test]
    fn row_and_category_queries() {
        let a = sample();
        assert_eq!(a.blocks_for_category("LAW").len(), 2);
        assert_eq!(a.blocks_for_row("1a").len(), 2);
        assert_eq!(a.occupied_seats_in_row("1A"), vec![1, 2, 3, 4, 5]);
        assert_eq!(a.categories(), vec!["MED", "LAW"]);
        assert_eq!(a.rows_used(), vec!["1A", "1B"]);
        assert_eq!(a.total_allocated_seats(), 6);
        assert_eq!(a.seat_map()["1B"][&1], "LAW");
    }

    #[test]
    fn summary_lists_rows_per_category() {
        let summary = sample().category_summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].category, "MED");
        assert_eq!(summary[0].total_seats, 4);
        assert_eq!(summary[1].total_seats, 2);
        assert_eq!(
            summary[1].rows,
            vec![
                RowUsage { row: "1A".into(), seats: 1, range: "5".into() },
                RowUsage { row: "1B".into(), seats: 1, range: "1".into() },
            ]
        );
    }

    #[test]
    fn free_seats_complement_occupied() {
        let free = sample().free_seats_per_row();
        assert_eq!(free[0], FreeSeats { row: "1A".into(), seats: vec![], count: 0 });
        assert_eq!(free[1], FreeSeats { row: "1B".into(), seats: vec![2, 3], count: 2 });
    }

    #[test]
    fn occupancy_handles_empty_layout() {
        let a = sample();
        assert!((a.occupancy_rate() - 75.0).abs() < 1e-9);
        assert_eq!(Allocation::from_parts(vec![], vec![], vec![]).occupancy_rate(), 0.0);
    }

    #[test]
    fn checksum_tracks_block_sequence() {
        let a = sample();
        assert_eq!(a.checksum(), sample().checksum());
        assert_eq!(a.checksum().len(), 64);

        let mut reordered = a.blocks().to_vec();
        reordered.swap(1, 2);
        let b = Allocation::from_parts(rows(), vec![], reordered);
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn checksum_hashes_canonical_json() {
        // sha256 of [{"category":"MED","row":"1A","seats":[1,2,3,4]},{"category":"LAW",...}]
        assert_eq!(
            sample().checksum(),
            "af93bb613f7f4b9962e1ff03fcd248d94354df91cfe706ed83813cddabdc16bd"
        );
    }
}
