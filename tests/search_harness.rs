#![allow(unused)]
//! Search orchestrator integration harness.
//!
//! # What this covers
//!
//! - **bbox paging walk**: bbox `[0,0,10,10]` over items `a`..`e` with limit
//!   2 yields `[a,b]` + next, `[c,d]` + next + previous, `[e]` + previous.
//! - **Typed predicates**: `gsd le 5` over gsd `[3,5,7]` returns exactly the
//!   items with gsd 3 and 5.
//! - **ids short-circuit**: a non-empty `ids` list makes bbox, datetime and
//!   `query` irrelevant, but `collections` still applies.
//! - **Temporal and spatial filters**: ranges with open ends, `intersects`
//!   winning over `bbox`.
//! - **Envelope**: `context`, `links`, and the `bbox` union of the page.
//! - **GET searches and item listings**: links carry the query string.
//! - **Client errors** never reach the store.
//!
//! # What this does NOT cover
//!
//! - HTTP status mapping (see http_harness)
//! - Token walking invariants under random data (see pagination_harness)
//!
//! # Running
//!
//! ```sh
//! cargo test --test search_harness
//! ```

mod common;
use common::*;

use geocat_core::links::LinkMethod;
use geocat_core::{Capability, Config, GetSearchParams, SearchError, SearchRequest};
use pretty_assertions::assert_eq;
use serde_json::json;

// ---------------------------------------------------------------------------
// Paging walk
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bbox_walk_pages_through_five_items() {
    let svc = service(grid_catalog());
    let first = request(json!({"bbox": [0, 0, 10, 10], "limit": 2}));

    let page1 = svc.search(&first).await.unwrap();
    assert_ids!(page1, ["a", "b"]);
    assert_tokens!(page1, next: true, previous: false);

    let page2 = svc
        .search(&SearchRequest {
            token: page1.next_token.clone(),
            ..first.clone()
        })
        .await
        .unwrap();
    assert_ids!(page2, ["c", "d"]);
    assert_tokens!(page2, next: true, previous: true);

    let page3 = svc
        .search(&SearchRequest {
            token: page2.next_token.clone(),
            ..first.clone()
        })
        .await
        .unwrap();
    assert_ids!(page3, ["e"]);
    assert_tokens!(page3, next: false, previous: true);

    let back = svc
        .search(&SearchRequest {
            token: page3.previous_token.clone(),
            ..first.clone()
        })
        .await
        .unwrap();
    assert_ids!(back, ["c", "d"]);
    assert_tokens!(back, next: true, previous: true);

    let context = page2.context.unwrap();
    assert_eq!((context.returned, context.limit, context.matched), (2, 2, Some(5)));
}

#[tokio::test]
async fn post_links_resend_the_token() {
    let svc = service(grid_catalog());
    let page = svc.search(&request(json!({"limit": 2}))).await.unwrap();
    let next = &page.links[0];
    assert_eq!(next.method, LinkMethod::Post);
    assert_eq!(next.href, "http://127.0.0.1:8080/search");
    assert!(next.merge);
    assert_eq!(next.body, Some(json!({"token": page.next_token.clone().unwrap()})));
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gsd_le_five_keeps_three_and_five() {
    let svc = service(gsd_catalog());
    let response = svc
        .search(&request(json!({"query": {"gsd": {"le": 5}}})))
        .await
        .unwrap();
    let mut gsd: Vec<f64> = response
        .features
        .iter()
        .map(|f| f["properties"]["gsd"].as_f64().unwrap())
        .collect();
    gsd.sort_by(f64::total_cmp);
    assert_eq!(gsd, vec![3.0, 5.0]);
}

#[tokio::test]
async fn ids_ignore_other_filters_but_not_collections() {
    let svc = service(mixed_catalog());
    let response = svc
        .search(&request(json!({
            "ids": ["s-oct", "l-jan", "missing"],
            "bbox": [100, 100, 101, 101],
            "datetime": "1999-01-01T00:00:00Z",
            "query": {"gsd": {"gt": 1000}},
        })))
        .await
        .unwrap();
    assert_ids!(response, ["l-jan", "s-oct"]);
    assert_eq!(response.context.unwrap().matched, Some(2));

    let scoped = svc
        .search(&request(json!({"ids": ["s-oct", "l-jan"], "collections": ["sentinel"]})))
        .await
        .unwrap();
    assert_ids!(scoped, ["s-oct"]);
}

#[tokio::test]
async fn open_ended_datetime_ranges() {
    let svc = service(mixed_catalog());
    let after = svc
        .search(&request(json!({"datetime": "2020-06-01T00:00:00Z/.."})))
        .await
        .unwrap();
    assert_ids!(after, ["s-oct", "s-jul"]);

    let before = svc
        .search(&request(json!({"datetime": "../2020-04-15T00:00:00Z"})))
        .await
        .unwrap();
    assert_ids!(before, ["l-apr", "l-jan"]);
}

#[tokio::test]
async fn intersects_wins_over_bbox() {
    let svc = service(mixed_catalog());
    let response = svc
        .search(&request(json!({
            "bbox": [0, 0, 10, 10],
            "intersects": {"type": "Point", "coordinates": [5.0, 5.0]},
        })))
        .await
        .unwrap();
    assert_ids!(response, ["l-apr"]);
    assert_eq!(response.bbox, Some([4.0, 4.0, 6.0, 6.0]));
}

#[tokio::test]
async fn collections_and_sort_combine() {
    let svc = service(mixed_catalog());
    let response = svc
        .search(&request(json!({
            "collections": ["landsat"],
            "sortby": [{"field": "eo:cloud_cover", "direction": "desc"}],
        })))
        .await
        .unwrap();
    assert_ids!(response, ["l-apr", "l-jan"]);
    assert_eq!(response.bbox, Some([0.0, 0.0, 6.0, 6.0]));
}

#[tokio::test]
async fn missing_sort_values_come_last_ascending() {
    let svc = service(mixed_catalog());
    let response = svc
        .search(&request(json!({"sortby": [{"field": "gsd", "direction": "asc"}]})))
        .await
        .unwrap();
    assert_ids!(response, ["s-jul", "l-apr", "l-jan", "s-oct"]);
}

#[tokio::test]
async fn empty_result_has_no_bbox_or_links() {
    let svc = service(mixed_catalog());
    let response = svc
        .search(&request(json!({"collections": ["modis"]})))
        .await
        .unwrap();
    assert!(response.features.is_empty());
    assert!(response.bbox.is_none());
    assert_tokens!(response, next: false, previous: false);
    assert_eq!(response.context.unwrap().matched, Some(0));
}

// ---------------------------------------------------------------------------
// Projection through the pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queried_fields_are_always_returned() {
    let svc = service(mixed_catalog());
    let response = svc
        .search(&request(json!({
            "query": {"eo:cloud_cover": {"lt": 50}},
            "fields": {"exclude": ["properties.eo:cloud_cover", "bbox", "collection"]},
        })))
        .await
        .unwrap();
    for feature in &response.features {
        assert!(feature["properties"].get("eo:cloud_cover").is_some());
        assert!(feature.get("bbox").is_some());
        assert!(feature["properties"].get("gsd").is_none());
        assert!(feature.get("collection").is_none());
    }
}

// ---------------------------------------------------------------------------
// GET searches and item listings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_search_links_echo_the_query_string() {
    let svc = service(grid_catalog());
    let params = GetSearchParams {
        bbox: Some("0,0,10,10".into()),
        limit: Some("2".into()),
        sortby: Some("-id".into()),
        ..Default::default()
    };
    let page = svc.get_search(&params).await.unwrap();
    assert_ids!(page, ["e", "d"]);

    let next = &page.links[0];
    assert_eq!(next.method, LinkMethod::Get);
    assert!(next.href.starts_with("http://127.0.0.1:8080/search?bbox=0%2C0%2C10%2C10&limit=2&sortby=-id&token="));
    assert!(next.body.is_none());

    let follow = GetSearchParams {
        token: page.next_token.clone(),
        ..params
    };
    let page2 = svc.get_search(&follow).await.unwrap();
    assert_ids!(page2, ["c", "b"]);
}

#[tokio::test]
async fn item_collection_pages_newest_first() {
    let svc = service(mixed_catalog());
    let page = svc.item_collection("landsat", Some(1), None).await.unwrap();
    assert_ids!(page, ["l-apr"]);
    assert_eq!(page.context.clone().unwrap().matched, Some(2));
    assert!(page.links[0].href.starts_with("http://127.0.0.1:8080/collections/landsat/items?limit=1&token="));
    assert!(page.features[0].get("collection").is_some());

    let next = svc
        .item_collection("landsat", Some(1), page.next_token.as_deref())
        .await
        .unwrap();
    assert_ids!(next, ["l-jan"]);
    assert_tokens!(next, next: false, previous: true);

    let unknown = svc.item_collection("modis", None, None).await.unwrap();
    assert!(unknown.features.is_empty());
}

// ---------------------------------------------------------------------------
// Client errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_errors_are_typed() {
    let svc = service(mixed_catalog());
    assert_search_err!(
        svc.search(&request(json!({"query": {"colour": {"eq": "red"}}}))).await,
        SearchError::UnknownField { .. }
    );
    assert_search_err!(
        svc.search(&request(json!({"query": {"gsd": {"eq": "ten"}}}))).await,
        SearchError::TypeMismatch { .. }
    );
    assert_search_err!(
        svc.search(&request(json!({"datetime": "../.."}))).await,
        SearchError::InvalidTemporalRange { .. }
    );
    assert_search_err!(
        svc.search(&request(json!({"bbox": [10, 0, 0, 10]}))).await,
        SearchError::InvalidSpatialFilter { .. }
    );
    assert_search_err!(
        svc.search(&request(json!({"bbox": [0, 0, 10]}))).await,
        SearchError::InvalidSpatialFilter { .. }
    );
    assert_search_err!(
        svc.search(&request(json!({"token": "not-a-token"}))).await,
        SearchError::InvalidToken { .. }
    );
    assert_search_err!(
        svc.search(&request(json!({"limit": 0}))).await,
        SearchError::LimitOutOfRange { .. }
    );
}

#[tokio::test]
async fn tokens_from_another_sort_are_rejected() {
    let svc = service(grid_catalog());
    let page = svc.search(&request(json!({"limit": 2}))).await.unwrap();
    let resorted = request(json!({
        "limit": 2,
        "sortby": [{"field": "id", "direction": "desc"}],
        "token": page.next_token.unwrap(),
    }));
    assert_search_err!(svc.search(&resorted).await, SearchError::InvalidToken { .. });
}

#[tokio::test]
async fn disabled_query_capability_rejects_query() {
    let mut config = Config::defaults();
    config.capabilities.query = false;
    let svc = service_with(mixed_catalog(), config);
    assert_search_err!(
        svc.search(&request(json!({"query": {"gsd": {"eq": 10}}}))).await,
        SearchError::CapabilityDisabled { capability: Capability::Query }
    );
}
