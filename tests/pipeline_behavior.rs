//! Behavior-driven tests for the read path
//!
//! These tests verify WHEN the service serves cached rows, WHEN it crawls,
//! and what callers observe when a step fails.

use std::sync::Arc;

use kospi_core::{
    FixtureHttpClient, HttpResponse, MemorySnapshotStore, Provenance, ServiceError, Snapshot,
    SnapshotStore, StockRow, StoreError,
};
use kospi_tests::{
    minutes_ago, ranking_page, service_with, top_three_page, upstream, FlakyStore, UpstreamRow,
};

// =============================================================================
// Refresh path
// =============================================================================

#[tokio::test]
async fn when_cache_is_empty_the_first_request_crawls_and_persists() {
    // Given: An empty store and an upstream serving the ranking page
    let store = MemorySnapshotStore::new();
    let http = upstream(top_three_page());
    let service = service_with(Arc::new(store.clone()), &http);

    // When: A client asks for the ranking
    let payload = service.load().await.expect("crawl succeeds");

    // Then: Rows come from the crawl, decoded, signed, and stored
    assert_eq!(payload.source, Provenance::Crawl);
    assert_eq!(payload.data.len(), 3);
    assert_eq!(payload.data[0].row.company_name, "삼성전자");
    assert_eq!(payload.data[0].row.change, -500);
    assert_eq!(payload.data[0].row.change_pct, -0.69);
    assert_eq!(payload.data[1].row.stock_code, "000660");
    assert_eq!(payload.data[1].row.change, 1_200);
    assert!(payload.data.iter().all(|r| r.updated_at == payload.data[0].updated_at));
    assert!(payload.data.iter().all(|r| !r.id.is_empty()));
    assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn when_cache_is_stale_the_service_recrawls_and_replaces_everything() {
    // Given: Ten rows written eleven minutes ago
    let store = MemorySnapshotStore::new();
    let old_rows: Vec<StockRow> = (1..=10)
        .map(|rank| StockRow {
            rank,
            stock_code: String::from("999999"),
            company_name: String::from("stale"),
            price: 1,
            change: 0,
            change_pct: 0.0,
        })
        .collect();
    store.insert_all(&Snapshot::new(old_rows), minutes_ago(11)).await;
    let http = upstream(top_three_page());
    let service = service_with(Arc::new(store.clone()), &http);

    // When: The ranking is requested
    let payload = service.load().await.expect("refresh succeeds");

    // Then: The whole previous generation is gone
    assert_eq!(payload.source, Provenance::Crawl);
    assert_eq!(payload.data.len(), 3);
    assert!(payload.data.iter().all(|r| r.row.company_name != "stale"));
    assert_eq!(http.request_count(), 1);
}

#[tokio::test]
async fn when_upstream_has_no_table_the_result_is_an_empty_crawl() {
    // Given: An upstream whose markup no longer matches
    let http = upstream(b"<html><body><p>maintenance</p></body></html>".to_vec());
    let service = service_with(Arc::new(MemorySnapshotStore::new()), &http);

    // When / Then: An empty crawl is a success, not an error
    let payload = service.load().await.expect("empty is valid");
    assert_eq!(payload.source, Provenance::Crawl);
    assert!(payload.data.is_empty());
}

#[tokio::test]
async fn when_upstream_lists_more_than_ten_only_the_first_ten_are_served() {
    // Given: Fifteen rows that all pass the rank filter
    let ranks = [
        "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "1", "2", "3", "4", "5",
    ];
    let rows: Vec<UpstreamRow<'_>> = ranks
        .into_iter()
        .map(|rank| UpstreamRow::rising(rank, "005930", "종목"))
        .collect();
    let http = upstream(ranking_page(&rows));
    let service = service_with(Arc::new(MemorySnapshotStore::new()), &http);

    // When
    let payload = service.load().await.expect("crawl succeeds");

    // Then
    let ranks: Vec<u32> = payload.data.iter().map(|r| r.row.rank).collect();
    assert_eq!(ranks, (1..=10).collect::<Vec<_>>());
}

// =============================================================================
// Cache path
// =============================================================================

#[tokio::test]
async fn when_cache_is_fresh_repeated_reads_are_identical() {
    // Given: A store filled by a first crawl
    let store = MemorySnapshotStore::new();
    let http = upstream(top_three_page());
    let service = service_with(Arc::new(store), &http);
    service.load().await.expect("initial crawl");

    // When: Two more reads happen within the TTL
    let first = service.load().await.expect("cache hit");
    let second = service.load().await.expect("cache hit");

    // Then: Both are cache hits with byte-identical data
    assert_eq!(first.source, Provenance::Cache);
    assert_eq!(second.source, Provenance::Cache);
    assert_eq!(
        serde_json::to_vec(&first.data).expect("json"),
        serde_json::to_vec(&second.data).expect("json")
    );
    assert_eq!(http.request_count(), 1, "only the initial crawl hits upstream");
}

#[tokio::test]
async fn when_cache_read_fails_the_service_degrades_to_a_crawl() {
    // Given: A store whose first read errors
    let store = Arc::new(FlakyStore::failing_first_reads(1));
    let http = upstream(top_three_page());
    let service = service_with(store, &http);

    // When
    let payload = service.load().await.expect("degrades to crawl");

    // Then
    assert_eq!(payload.source, Provenance::Crawl);
    assert_eq!(payload.data.len(), 3);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn when_insert_fails_after_delete_the_store_is_left_empty() {
    // Given: A populated store whose insert step fails
    let store = Arc::new(FlakyStore::failing_insert());
    store
        .inner
        .insert_all(
            &Snapshot::new(vec![StockRow {
                rank: 1,
                stock_code: String::from("005930"),
                company_name: String::from("previous"),
                price: 70_000,
                change: 0,
                change_pct: 0.0,
            }]),
            minutes_ago(30),
        )
        .await;
    let http = upstream(top_three_page());
    let service = service_with(store.clone(), &http);

    // When: A refresh is attempted
    let err = service.load().await.expect_err("insert fails");

    // Then: The request fails and the previous snapshot is not resurrected
    assert!(matches!(err, ServiceError::Store(StoreError::Insert(_))));
    assert!(store.read_snapshot().await.expect("read").is_empty());
}

#[tokio::test]
async fn when_upstream_is_unreachable_the_request_fails_and_store_is_untouched() {
    // Given: A stale store and a dead upstream
    let store = MemorySnapshotStore::new();
    store
        .insert_all(
            &Snapshot::new(vec![StockRow {
                rank: 1,
                stock_code: String::from("005930"),
                company_name: String::from("previous"),
                price: 70_000,
                change: 0,
                change_pct: 0.0,
            }]),
            minutes_ago(30),
        )
        .await;
    let http = FixtureHttpClient::failing("connection refused");
    let service = service_with(Arc::new(store.clone()), &http);

    // When
    let err = service.load().await.expect_err("fetch fails");

    // Then: No retry, no partial data, old rows still there
    assert!(matches!(err, ServiceError::Fetch(_)));
    assert_eq!(http.request_count(), 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn when_upstream_returns_an_error_status_it_is_reported() {
    let http = FixtureHttpClient::responding(HttpResponse::new(404, Vec::new()));
    let service = service_with(Arc::new(MemorySnapshotStore::new()), &http);

    let err = service.load().await.expect_err("404");

    assert_eq!(err.to_string(), "[crawl] HTTP 404");
}
