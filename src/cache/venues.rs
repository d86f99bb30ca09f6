use tracing::warn;

use crate::cache::CacheService;
use crate::models::VenueSummary;
use crate::store::{self, StoreError};

const VENUES_KEY: &str = "venues:active";

impl CacheService {
    /// Active venues, from Redis when possible.
    pub async fn get_venues(&self) -> Result<Vec<VenueSummary>, StoreError> {
        match self.read_json::<Vec<VenueSummary>>(VENUES_KEY).await {
            Ok(Some(venues)) => return Ok(venues),
            Ok(None) => {}
            Err(e) => warn!("Venue cache read failed: {}", e),
        }

        let venues: Vec<VenueSummary> = store::venues::list_active(&self.db.pool)
            .await?
            .iter()
            .map(VenueSummary::from)
            .collect();

        if let Err(e) = self.write_json(VENUES_KEY, &venues).await {
            warn!("Venue cache write failed: {}", e);
        }
        Ok(venues)
    }

    pub async fn invalidate_venues(&self) {
        self.evict(VENUES_KEY).await;
    }
}
