//! Resumable order listing across invocations.

use std::time::Duration;

use storeops_admin::OutputStore;
use storeops_admin::api::SortOrder;
use storeops_admin::orders::listing::CHECKPOINT_FILE;
use storeops_admin::orders::{ListingOptions, OrderListError, ResumableListFetcher, RetryPolicy};
use storeops_core::PaginationCheckpoint;
use storeops_integration_tests::FakeCommerce;

fn options(page_size: u32) -> ListingOptions {
    ListingOptions {
        query: None,
        query_format: None,
        sort_by: Some("creation_date".to_string()),
        sort_order: Some(SortOrder::Asc),
        columns: vec!["id".to_string(), "customer_info.email".to_string()],
        page_size,
    }
}

// ============================================================================
// Resume
// ============================================================================

#[tokio::test]
async fn test_resume_continues_at_failed_page() {
    let dir = tempfile::tempdir().unwrap();
    let store = OutputStore::new(dir.path());
    let api = FakeCommerce::with_records("ORD", 7);
    api.fail_listing_at(4);

    let fetcher = ResumableListFetcher::new(&api, &store)
        .with_retry(RetryPolicy::immediate(2))
        .with_delay(Duration::ZERO);

    let err = fetcher.run(&options(2)).await.unwrap_err();
    let OrderListError::Resumable { page, attempts, .. } = &err else {
        panic!("expected a resumable error, got {err}");
    };
    assert_eq!(*page, 3);
    assert_eq!(*attempts, 2);
    assert_eq!(api.requested_offsets(), vec![0, 2, 4, 4]);

    let checkpoint: PaginationCheckpoint = store.read_json(CHECKPOINT_FILE).await.unwrap();
    assert_eq!(checkpoint.page, 3);
    assert_eq!(checkpoint.offset, 4);
    assert_eq!(checkpoint.fetched, 4);

    api.recover();
    api.clear_requests();
    let outcome = fetcher.run(&options(2)).await.unwrap();

    // Pages 1 and 2 are neither requested nor appended again
    assert_eq!(api.requested_offsets(), vec![4, 6]);
    assert!(outcome.resumed);
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.fetched, 7);
    assert_eq!(outcome.total, 7);
    assert_eq!(outcome.output_path.to_string_lossy(), checkpoint.output_path);
    assert!(!store.exists(CHECKPOINT_FILE).await);

    let csv = std::fs::read_to_string(&outcome.output_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines.first(), Some(&"id,customer_info.email"));
    assert_eq!(lines.get(1), Some(&"ORD0,customer0@example.com"));
    assert_eq!(lines.last(), Some(&"ORD6,customer6@example.com"));
    assert_eq!(lines.iter().filter(|line| line.starts_with("ORD3,")).count(), 1);
}

#[tokio::test]
async fn test_fresh_run_leaves_no_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let store = OutputStore::new(dir.path());
    let api = FakeCommerce::with_records("ORD", 4);

    let outcome = ResumableListFetcher::new(&api, &store)
        .with_delay(Duration::ZERO)
        .run(&options(2))
        .await
        .unwrap();

    assert!(!outcome.resumed);
    // Exact multiple of the page size ends on the reported total
    assert_eq!(api.requested_offsets(), vec![0, 2]);
    assert_eq!(store.list().await.unwrap().len(), 1);
    let name = outcome.output_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("orders_list_"));
}
