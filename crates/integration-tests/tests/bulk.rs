//! Bulk delete and bulk fetch driven from ID list files.

use serde_json::Value;
use storeops_admin::OutputStore;
use storeops_admin::bulk::BulkError;
use storeops_admin::orders::{FetchOptions, fetch_from_file};
use storeops_admin::products::{DeleteOptions, delete_from_file};
use storeops_integration_tests::FakeCommerce;

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// Product Deletion
// ============================================================================

#[tokio::test]
async fn test_ids_without_prefix_are_never_submitted() {
    let dir = tempfile::tempdir().unwrap();
    let store = OutputStore::new(dir.path().join("output"));
    let archive = dir.path().join("archive");
    let input = dir.path().join("ids.csv");
    std::fs::write(&input, "id\nPA1\nXB2\nPA3\n\nPA404\n").unwrap();

    let api = FakeCommerce::with_products(&["PA1", "PA3", "XB2"]);
    let options = DeleteOptions::new("staging", 2).unwrap();
    let outcome = delete_from_file(&api, &store, &input, &archive, &options).await.unwrap();

    let mut submitted = api.deleted();
    submitted.sort();
    assert_eq!(submitted, vec!["PA1", "PA3", "PA404"]);

    let report = &outcome.report;
    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.not_found_count(), 1);
    assert_eq!(report.succeeded + report.failed + report.skipped, report.total);

    let saved = read_json(&outcome.report_path);
    assert_eq!(saved["deleted"], 2);
    assert_eq!(saved["skipped"], 1);
    assert_eq!(saved["errors"][0]["id"], "PA404");
    assert_eq!(saved["errors"][0]["statusCode"], 404);

    let archived = outcome.archived.unwrap();
    assert!(archived.starts_with(&archive));
    assert!(!input.exists());
}

#[tokio::test]
async fn test_empty_id_list_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = OutputStore::new(dir.path());
    let input = dir.path().join("ids.csv");
    std::fs::write(&input, "id\n\n").unwrap();

    let api = FakeCommerce::default();
    let options = DeleteOptions::new("dev", 5).unwrap();
    let err = delete_from_file(&api, &store, &input, dir.path(), &options)
        .await
        .unwrap_err();

    assert!(matches!(err, BulkError::EmptyInput(_)));
    assert!(api.deleted().is_empty());
    assert!(input.exists());
}

#[test]
fn test_concurrency_bounds() {
    assert!(DeleteOptions::new("dev", 0).is_err());
    assert!(DeleteOptions::new("dev", 10).is_ok());
    assert!(DeleteOptions::new("dev", 11).is_err());
}

// ============================================================================
// Order Fetch
// ============================================================================

#[tokio::test]
async fn test_fetch_writes_orders_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let store = OutputStore::new(dir.path().join("output"));
    let archive = dir.path().join("archive");
    let input = dir.path().join("orders.csv");
    std::fs::write(&input, "ORD0\nORD1\nORD9\n").unwrap();

    let api = FakeCommerce::with_records("ORD", 2);
    let options = FetchOptions::new("prod", 3, Vec::new()).unwrap();
    let outcome = fetch_from_file(&api, &store, &input, &archive, &options).await.unwrap();

    assert_eq!(outcome.report.succeeded, 2);
    assert_eq!(outcome.report.failed, 1);

    let orders = read_json(outcome.json_path.as_deref().unwrap());
    assert_eq!(orders["total"], 2);
    assert_eq!(orders["source"], "orders.csv");
    assert_eq!(orders["items"][0]["id"], "ORD0");
    assert_eq!(orders["items"][1]["id"], "ORD1");

    let csv = std::fs::read_to_string(outcome.csv_path.unwrap()).unwrap();
    assert!(csv.starts_with("customer_info,id,status\n"));

    let report = read_json(&outcome.report_path);
    assert_eq!(report["fetched"], 2);
    assert!(report.get("deleted").is_none());
}
