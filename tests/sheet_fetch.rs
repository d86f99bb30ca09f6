use chrono::NaiveDate;
use seat_allocator::config::SheetConfig;
use seat_allocator::services::sheet::{SheetCourse, SheetError, SheetImporter};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHEET: &str = "\
26/08/2025 - FAMED; FFOE; ICA,,,
Unit,Course,Graduates,Present
FAMED,Medicine,40,40
FFOE,Nursing,12,11
,TOTAL,52,51
";

fn importer() -> SheetImporter {
    SheetImporter::new(&SheetConfig { timeout_seconds: 5 }).unwrap()
}

#[tokio::test]
async fn downloads_and_parses_a_csv_export() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/d/abc/export"))
        .and(query_param("format", "csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SHEET))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/spreadsheets/d/abc/export?format=csv", server.uri());
    let data = importer().fetch(&url).await.unwrap();

    assert_eq!(data.ceremony_name, "Graduation FAMED; FFOE; ICA");
    assert_eq!(data.date, NaiveDate::from_ymd_opt(2025, 8, 26));
    assert_eq!(
        data.courses,
        vec![
            SheetCourse { name: "MEDICINE".into(), graduates: 40 },
            SheetCourse { name: "NURSING".into(), graduates: 12 },
        ]
    );
}

#[tokio::test]
async fn upstream_errors_are_reported_with_their_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = importer().fetch(&format!("{}/missing", server.uri())).await.unwrap_err();
    assert!(matches!(err, SheetError::Status(404)));
}

#[tokio::test]
async fn short_sheets_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("26/08/2025 - ICA\nUnit,Course\n"))
        .mount(&server)
        .await;

    let err = importer().fetch(&server.uri()).await.unwrap_err();
    assert!(matches!(err, SheetError::NotEnoughData));
}
