use tracing::warn;
use uuid::Uuid;

use crate::cache::CacheService;
use crate::services::seating::AllocationReport;

fn report_key(ceremony_id: Uuid) -> String {
    format!("allocation:{ceremony_id}")
}

impl CacheService {
    pub async fn get_report(&self, ceremony_id: Uuid) -> Option<AllocationReport> {
        match self.read_json(&report_key(ceremony_id)).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Allocation cache read failed for {}: {}", ceremony_id, e);
                None
            }
        }
    }

    pub async fn cache_report(&self, report: &AllocationReport) {
        if let Err(e) = self.write_json(&report_key(report.ceremony_id), report).await {
            warn!("Allocation cache write failed for {}: {}", report.ceremony_id, e);
        }
    }

    pub async fn invalidate_report(&self, ceremony_id: Uuid) {
        self.evict(&report_key(ceremony_id)).await;
    }
}
