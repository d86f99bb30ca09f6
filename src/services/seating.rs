//! Ceremony seating: generating, storing and reporting allocations, and the
//! spreadsheet import that chains all of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::CacheService;
use crate::database::Database;
use crate::error::{AllocationError, Error, Result};
use crate::models::{
    Category, Ceremony, CeremonySummary, FreeSeats, RowUsage, SeatBlock, Venue,
};
use crate::services::allocation::allocate;
use crate::services::sheet::SheetImporter;
use crate::store::{self, allocations::StoredAllocation, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category_id: String,
    pub name: String,
    pub total_seats: usize,
    pub rows: Vec<RowUsage>,
}

/// Read model of a stored allocation, as served and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub allocation_id: Uuid,
    pub ceremony_id: Uuid,
    pub ceremony_name: String,
    pub venue_id: Uuid,
    pub venue_name: String,
    pub checksum: String,
    pub notes: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub total_capacity: u32,
    pub total_allocated: usize,
    pub occupancy_rate: f64,
    pub categories: Vec<CategoryReport>,
    pub free_seats: Vec<FreeSeats>,
    pub blocks: Vec<SeatBlock>,
}

impl AllocationReport {
    /// `names` maps category ids to display names; unknown ids are shown as is.
    pub fn build(
        stored: &StoredAllocation,
        ceremony_name: &str,
        venue_name: &str,
        names: &HashMap<String, String>,
    ) -> Self {
        let allocation = &stored.allocation;
        let categories = allocation
            .category_summary()
            .into_iter()
            .map(|summary| CategoryReport {
                name: names
                    .get(&summary.category)
                    .cloned()
                    .unwrap_or_else(|| summary.category.clone()),
                category_id: summary.category,
                total_seats: summary.total_seats,
                rows: summary.rows,
            })
            .collect();

        Self {
            allocation_id: stored.id,
            ceremony_id: stored.ceremony_id,
            ceremony_name: ceremony_name.to_string(),
            venue_id: stored.venue_id,
            venue_name: venue_name.to_string(),
            checksum: stored.checksum.clone(),
            notes: stored.notes.clone(),
            generated_at: stored.generated_at,
            total_capacity: allocation.total_capacity(),
            total_allocated: allocation.total_allocated_seats(),
            occupancy_rate: allocation.occupancy_rate(),
            categories,
            free_seats: allocation.free_seats_per_row(),
            blocks: allocation.blocks().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// The ceremony was already imported and was returned untouched.
    pub already_existed: bool,
    pub ceremony: CeremonySummary,
    pub categories_created: Vec<String>,
    pub categories_reused: Vec<String>,
    pub allocation: Option<AllocationReport>,
}

#[derive(Clone)]
pub struct SeatingService {
    db: Database,
    cache: CacheService,
    importer: SheetImporter,
    seats_per_graduate: u32,
}

impl SeatingService {
    pub fn new(
        db: Database,
        cache: CacheService,
        importer: SheetImporter,
        seats_per_graduate: u32,
    ) -> Self {
        Self {
            db,
            cache,
            importer,
            seats_per_graduate,
        }
    }

    pub fn seats_per_graduate(&self) -> u32 {
        self.seats_per_graduate
    }

    /// (Re)generates the allocation of a ceremony. The ceremony row stays
    /// locked until the new allocation is stored, so concurrent runs queue up.
    pub async fn generate(&self, ceremony_id: Uuid, notes: Option<&str>) -> Result<AllocationReport> {
        let mut tx = self.db.pool.begin().await.map_err(StoreError::from)?;

        let mut ceremony = store::ceremonies::lock(&mut *tx, ceremony_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("ceremony {ceremony_id}")))?;
        if !ceremony.can_generate_allocation() {
            warn!(
                "Refusing allocation for ceremony {} in status {} with {} courses",
                ceremony.id,
                ceremony.status(),
                ceremony.courses().len()
            );
            return Err(Error::Conflict(format!(
                "ceremony {} cannot be allocated: it needs courses and must be planning or confirmed",
                ceremony.id
            )));
        }
        let venue = store::venues::find_active(&mut *tx, ceremony.venue_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("venue {}", ceremony.venue_id)))?;

        let stored = self.store_allocation(&mut tx, &mut ceremony, &venue, notes).await?;
        tx.commit().await.map_err(StoreError::from)?;

        let report = self.build_report(&stored, &ceremony.name, &venue.name).await?;
        self.cache.cache_report(&report).await;
        Ok(report)
    }

    /// The stored allocation of a ceremony, from cache when possible.
    pub async fn report(&self, ceremony_id: Uuid) -> Result<AllocationReport> {
        if let Some(report) = self.cache.get_report(ceremony_id).await {
            return Ok(report);
        }

        let ceremony = store::ceremonies::find_active(&self.db.pool, ceremony_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("ceremony {ceremony_id}")))?;
        let stored = store::allocations::find_for_ceremony(&self.db.pool, ceremony_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("allocation for ceremony {ceremony_id}")))?;
        // the venue may have been soft-deleted since
        let venue_name = store::venues::find(&self.db.pool, stored.venue_id)
            .await?
            .map(|v| v.name)
            .unwrap_or_default();

        let report = self.build_report(&stored, &ceremony.name, &venue_name).await?;
        self.cache.cache_report(&report).await;
        Ok(report)
    }

    /// Downloads a ceremony sheet and turns it into a ceremony with a stored
    /// allocation. Nothing is persisted unless the whole chain succeeds.
    pub async fn import_sheet(&self, url: &str, venue_id: Uuid, overwrite: bool) -> Result<ImportOutcome> {
        let venue = store::venues::find_active(&self.db.pool, venue_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("venue {venue_id}")))?;

        let sheet = self.importer.fetch(url).await?;
        let date = sheet
            .date
            .ok_or_else(|| Error::BadRequest("sheet title has no valid DD/MM/YYYY date".into()))?;
        if sheet.courses.is_empty() {
            return Err(Error::BadRequest("no courses found in sheet".into()));
        }

        let existing =
            store::ceremonies::find_matching(&self.db.pool, &sheet.ceremony_name, date, venue.id).await?;
        if let Some(existing) = &existing {
            if !overwrite {
                info!("Sheet import matched existing ceremony {}", existing.id);
                let allocation = match self.report(existing.id).await {
                    Ok(report) => Some(report),
                    Err(Error::NotFound(_)) => None,
                    Err(e) => return Err(e),
                };
                return Ok(ImportOutcome {
                    already_existed: true,
                    ceremony: existing.summary(self.seats_per_graduate),
                    categories_created: Vec::new(),
                    categories_reused: Vec::new(),
                    allocation,
                });
            }
        }

        let mut tx = self.db.pool.begin().await.map_err(StoreError::from)?;
        // the replaced ceremony goes in the same transaction as its successor
        let replaced = match &existing {
            Some(existing) => {
                info!("Overwriting ceremony {} from sheet import", existing.id);
                store::ceremonies::delete(&mut *tx, existing.id).await?;
                Some(existing.id)
            }
            None => None,
        };
        let mut ceremony = Ceremony::new(&sheet.ceremony_name, date, venue.id);
        let mut categories_created = Vec::new();
        let mut categories_reused = Vec::new();

        for course in &sheet.courses {
            let category = match store::categories::find_active_by_name(&mut *tx, &course.name).await? {
                Some(category) => {
                    if !categories_reused.contains(&category.name) && !categories_created.contains(&category.name) {
                        categories_reused.push(category.name.clone());
                    }
                    category
                }
                None => {
                    let mut category = Category::new(&course.name, None, None)?;
                    store::categories::save(&mut *tx, &mut category).await?;
                    categories_created.push(category.name.clone());
                    category
                }
            };
            // a course listed twice is merged
            match ceremony.course(category.id).map(|c| c.graduates) {
                Some(graduates) => {
                    ceremony.update_course(category.id, graduates.saturating_add(course.graduates))?
                }
                None => ceremony.add_course(category.id, course.graduates)?,
            }
        }
        ceremony.validate()?;

        // dropping the transaction rolls back the categories created above
        if !ceremony.fits_in(&venue, self.seats_per_graduate) {
            let required = ceremony.required_seats(self.seats_per_graduate);
            warn!(
                "Sheet import rejected: {} seats required, venue {} has {}",
                required,
                venue.id,
                venue.total_capacity()
            );
            return Err(AllocationError::InsufficientCapacity {
                required,
                available: venue.total_capacity(),
            }
            .into());
        }

        store::ceremonies::save(&mut *tx, &mut ceremony).await?;
        let stored = self.store_allocation(&mut tx, &mut ceremony, &venue, None).await?;
        tx.commit().await.map_err(StoreError::from)?;
        if let Some(id) = replaced {
            self.cache.invalidate_report(id).await;
        }

        let report = self.build_report(&stored, &ceremony.name, &venue.name).await?;
        self.cache.cache_report(&report).await;

        Ok(ImportOutcome {
            already_existed: false,
            ceremony: ceremony.summary(self.seats_per_graduate),
            categories_created,
            categories_reused,
            allocation: Some(report),
        })
    }

    // Runs the engine, re-verifies the result and writes it with the
    // ceremony's flag, all on the caller's transaction.
    async fn store_allocation(
        &self,
        conn: &mut PgConnection,
        ceremony: &mut Ceremony,
        venue: &Venue,
        notes: Option<&str>,
    ) -> Result<StoredAllocation> {
        let allocation = allocate(&venue.ordered_rows(), &ceremony.demands(self.seats_per_graduate))
            .inspect_err(|e| warn!("Allocation for ceremony {} rejected: {}", ceremony.id, e))?;
        allocation.verify()?;

        let stored =
            store::allocations::replace(&mut *conn, ceremony.id, venue.id, &allocation, notes).await?;
        ceremony.mark_allocation_generated();
        store::ceremonies::save(&mut *conn, ceremony).await?;

        info!(
            "Allocation generated: ceremony={} venue={} seats={} occupancy={:.2}%",
            ceremony.id,
            venue.id,
            allocation.total_allocated_seats(),
            allocation.occupancy_rate()
        );
        Ok(stored)
    }

    async fn build_report(
        &self,
        stored: &StoredAllocation,
        ceremony_name: &str,
        venue_name: &str,
    ) -> Result<AllocationReport> {
        let ids: Vec<Uuid> = stored
            .allocation
            .categories()
            .into_iter()
            .filter_map(|c| Uuid::parse_str(c).ok())
            .collect();
        let names: HashMap<String, String> = store::categories::find_many(&self.db.pool, &ids)
            .await?
            .into_iter()
            .map(|c| (c.id.to_string(), c.name))
            .collect();
        Ok(AllocationReport::build(stored, ceremony_name, venue_name, &names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Allocation, CategoryDemand, Row};

    fn stored() -> StoredAllocation {
        let rows = vec![Row::new("1A", 5, None).unwrap(), Row::new("1B", 3, None).unwrap()];
        let demands = vec![CategoryDemand::new("med", 4), CategoryDemand::new("law", 2)];
        let allocation = allocate(&rows, &demands).unwrap();
        StoredAllocation {
            id: Uuid::new_v4(),
            ceremony_id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            checksum: allocation.checksum(),
            allocation,
            notes: None,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn report_names_categories_and_lists_free_seats() {
        let stored = stored();
        let names = HashMap::from([("med".to_string(), "MEDICINE".to_string())]);
        let report = AllocationReport::build(&stored, "Graduation FAMED", "Main Hall", &names);

        assert_eq!(report.total_capacity, 8);
        assert_eq!(report.total_allocated, 6);
        assert_eq!(report.occupancy_rate, 75.0);
        assert_eq!(report.categories[0].name, "MEDICINE");
        // no name known: falls back to the raw category key
        assert_eq!(report.categories[1].name, "law");
        assert_eq!(report.categories[1].rows[0].range, "5");
        assert_eq!(report.categories[1].rows[1].range, "1");
        assert_eq!(report.free_seats[0].count, 0);
        assert_eq!(report.free_seats[1].seats, vec![2, 3]);
    }

    #[test]
    fn report_survives_a_json_round_trip() {
        let report = AllocationReport::build(&stored(), "c", "v", &HashMap::new());
        let json = serde_json::to_string(&report).unwrap();
        let back: AllocationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
        assert_eq!(
            Allocation::from_parts(Vec::new(), Vec::new(), back.blocks).checksum(),
            report.checksum
        );
    }
}
