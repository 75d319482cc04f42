//! End-to-end tests for the ingest pipeline
//!
//! Drives fetch → flatten → clean → split against a mock HTTP source and
//! checks the staged artifacts. The database leg is exercised separately by
//! the loader's unit tests since these tests run without Postgres.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fip_ingest::config::{DatabaseConfig, IngestConfig};
use fip_ingest::pipeline::Pipeline;
use fip_ingest::split::split;
use fip_ingest::staging;

fn test_config(api_url: String, dir: &std::path::Path) -> IngestConfig {
    IngestConfig {
        api_url,
        page_size: 10,
        raw_path: dir.join("raw_data.json").to_string_lossy().into_owned(),
        cleaned_path: dir.join("cleaned_data.csv").to_string_lossy().into_owned(),
        database: DatabaseConfig {
            url: "postgresql://localhost/fip_test".into(),
            max_connections: 1,
            connect_timeout_secs: 1,
        },
    }
}

/// The two-record scenario: one valid row, one row with a null identity.
fn source_page() -> serde_json::Value {
    json!([
        {
            "inspection_id": "1",
            "license_": "100",
            "dba_name": "Corner Grill",
            "inspection_date": "2024-01-01",
            "results": "Pass",
            "latitude": "41.8",
            "longitude": "-87.6",
            "location": {"latitude": "41.8", "longitude": "-87.6"}
        },
        {
            "inspection_id": null,
            "license_": "200",
            "dba_name": "Ghost Kitchen",
            "inspection_date": "2024-02-02",
            "latitude": "41.9",
            "longitude": "-87.7",
            "location": {"latitude": "41.9", "longitude": "-87.7"}
        }
    ])
}

async fn mock_source() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/inspections"))
        .and(query_param("$offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(source_page()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/inspections"))
        .and(query_param("$offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn two_record_scenario_produces_one_facility_and_one_inspection() {
    let server = mock_source().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(format!("{}/inspections", server.uri()), dir.path());
    let pipeline = Pipeline::new(config);

    let raw = pipeline.fetch().await.unwrap();
    assert_eq!(raw.records.len(), 2);
    assert_eq!(raw.pages, 1);
    assert!(!raw.truncated);

    let cleaned = pipeline.transform(&raw.records).unwrap();
    // The null-identity record is dropped.
    assert_eq!(cleaned.records.len(), 1);
    assert_eq!(cleaned.report.rows_missing_identity, 1);

    // The nested geocoordinates duplicated the top-level columns everywhere,
    // so the nested columns are gone from the cleaned set.
    for record in &cleaned.records {
        assert!(!record.contains_key("location_latitude"));
        assert!(!record.contains_key("location_longitude"));
    }

    let outcome = split(&cleaned.records);
    assert_eq!(outcome.facilities.len(), 1);
    assert_eq!(outcome.facilities[0].license_number, 100);
    assert_eq!(outcome.facilities[0].latitude, Some(41.8));
    assert_eq!(outcome.inspections.len(), 1);
    assert_eq!(outcome.inspections[0].inspection_id, 1);
    assert_eq!(outcome.inspections[0].license_number, Some(100));
    assert_eq!(
        outcome.inspections[0].inspection_date,
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
    );
}

#[tokio::test]
async fn staged_artifacts_allow_resuming_at_transform_and_load() {
    let server = mock_source().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(format!("{}/inspections", server.uri()), dir.path());
    let pipeline = Pipeline::new(config.clone());

    let raw = pipeline.fetch().await.unwrap();
    let cleaned = pipeline.transform(&raw.records).unwrap();

    // Resume at transform: the raw staging file round-trips.
    let restaged = staging::read_raw(&config.raw_path).unwrap();
    assert_eq!(restaged.len(), 2);

    // Resume at load: the cleaned CSV feeds the splitter with text values
    // and produces the same entities.
    let reloaded = staging::read_cleaned(&config.cleaned_path).unwrap();
    assert_eq!(reloaded.len(), cleaned.records.len());

    let outcome = split(&reloaded);
    assert_eq!(outcome.facilities.len(), 1);
    assert_eq!(outcome.facilities[0].license_number, 100);
    assert_eq!(outcome.inspections.len(), 1);
    assert_eq!(outcome.inspections[0].inspection_id, 1);
}

#[tokio::test]
async fn truncated_fetch_still_stages_partial_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/inspections"))
        .and(query_param("$offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(source_page()))
        .mount(&server)
        .await;
    // Page size 2 forces a second request, which fails.
    Mock::given(method("GET"))
        .and(path("/inspections"))
        .and(query_param("$offset", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(format!("{}/inspections", server.uri()), dir.path());
    config.page_size = 2;
    let pipeline = Pipeline::new(config.clone());

    let raw = pipeline.fetch().await.unwrap();
    assert!(raw.truncated);
    assert_eq!(raw.records.len(), 2);

    // Partial data still flows downstream.
    let cleaned = pipeline.transform(&raw.records).unwrap();
    assert_eq!(cleaned.records.len(), 1);
    assert!(staging::read_raw(&config.raw_path).is_ok());
}

#[tokio::test]
async fn empty_source_stages_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/inspections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(format!("{}/inspections", server.uri()), dir.path());
    let pipeline = Pipeline::new(config.clone());

    let raw = pipeline.fetch().await.unwrap();
    assert!(raw.records.is_empty());
    assert!(!std::path::Path::new(&config.raw_path).exists());
}
