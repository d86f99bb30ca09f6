//! Sheet imports against a live Postgres and Redis.
//!
//! Run with `DATABASE_URL` and `REDIS_URL` set: `cargo test -- --ignored`.

use seat_allocator::cache::CacheService;
use seat_allocator::config::SheetConfig;
use seat_allocator::database::Database;
use seat_allocator::error::{AllocationError, Error};
use seat_allocator::models::Venue;
use seat_allocator::redis_client::RedisClient;
use seat_allocator::services::{SeatingService, SheetImporter};
use seat_allocator::store;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn seating() -> (Database, SeatingService) {
    let db = Database::new(&std::env::var("DATABASE_URL").unwrap(), 5).await.unwrap();
    db.run_migrations().await.unwrap();
    let redis = RedisClient::new(&std::env::var("REDIS_URL").unwrap()).await.unwrap();
    let cache = CacheService::new(redis, db.clone(), 60);
    let importer = SheetImporter::new(&SheetConfig { timeout_seconds: 5 }).unwrap();
    (db.clone(), SeatingService::new(db, cache, importer, 1))
}

fn sheet(unit: &str, course: &str, graduates: u32) -> String {
    format!("26/08/2025 - {unit},,,\nUnit,Course,Graduates\n{unit},{course},{graduates}\n")
}

async fn serve(server: &MockServer, route: &str, body: String) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
    format!("{}{route}", server.uri())
}

#[tokio::test]
#[ignore = "needs DATABASE_URL and REDIS_URL"]
async fn failed_overwrite_keeps_the_previous_ceremony() {
    let (db, seating) = seating().await;
    let server = MockServer::start().await;
    let tag = Uuid::new_v4().simple().to_string();
    let unit = format!("U{}", &tag[..8]);
    let course = format!("COURSE {}", &tag[..8]);

    let mut venue = Venue::new(&format!("Hall {}", &tag[..8]), None);
    venue.add_row("1A", 50, None).unwrap();
    store::venues::save(&db.pool, &mut venue).await.unwrap();

    let small = serve(&server, "/small", sheet(&unit, &course, 40)).await;
    let first = seating.import_sheet(&small, venue.id, false).await.unwrap();
    assert!(!first.already_existed);
    let ceremony_id = first.ceremony.id;

    // same title and date, but more graduates than the hall holds
    let large = serve(&server, "/large", sheet(&unit, &course, 80)).await;
    let err = seating.import_sheet(&large, venue.id, true).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Allocation(AllocationError::InsufficientCapacity { required: 80, available: 50 })
    ));

    assert!(store::ceremonies::find_active(&db.pool, ceremony_id).await.unwrap().is_some());
    let kept = store::allocations::find_for_ceremony(&db.pool, ceremony_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.allocation.total_allocated_seats(), 40);

    let again = seating.import_sheet(&small, venue.id, false).await.unwrap();
    assert!(again.already_existed);
    assert_eq!(again.ceremony.id, ceremony_id);
}
