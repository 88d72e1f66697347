//! Test builders: ergonomic constructors for items, services and paging.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use std::sync::Arc;

use geocat_core::{Config, Item, SearchError, SearchRequest, SearchResponse, SearchService};
use geocat_store::MemoryStore;
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// ItemBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Item`] fixtures.
///
/// # Example
///
/// ```rust
/// let item = ItemBuilder::new("scene-1")
///     .collection("landsat")
///     .at(3.0, 4.0)
///     .property("gsd", 30.0)
///     .build();
/// ```
pub struct ItemBuilder {
    id: String,
    collection: String,
    geometry: Value,
    bbox: Option<Vec<f64>>,
    properties: Map<String, Value>,
}

impl ItemBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let mut properties = Map::new();
        properties.insert("datetime".into(), json!("2020-06-01T00:00:00Z"));
        Self {
            id: id.into(),
            collection: "landsat".to_string(),
            geometry: json!({"type": "Point", "coordinates": [1.0, 1.0]}),
            bbox: None,
            properties,
        }
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Point geometry at (`x`, `y`).
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.geometry = json!({"type": "Point", "coordinates": [x, y]});
        self
    }

    /// Axis-aligned polygon footprint.
    pub fn footprint(mut self, minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        self.geometry = json!({
            "type": "Polygon",
            "coordinates": [[[minx, miny], [maxx, miny], [maxx, maxy], [minx, maxy], [minx, miny]]]
        });
        self.bbox = Some(vec![minx, miny, maxx, maxy]);
        self
    }

    pub fn datetime(self, rfc3339: &str) -> Self {
        self.property("datetime", rfc3339)
    }

    pub fn without(mut self, key: &str) -> Self {
        self.properties.remove(key);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Item {
        let mut raw = json!({
            "id": self.id,
            "collection": self.collection,
            "geometry": self.geometry,
            "properties": self.properties,
            "links": [],
            "assets": {"thumbnail": {"href": "https://example.com/thumb.png"}},
        });
        if let Some(bbox) = self.bbox {
            raw["bbox"] = json!(bbox);
        }
        serde_json::from_value(raw).expect("builder produced an invalid item")
    }
}

// ---------------------------------------------------------------------------
// Service construction
// ---------------------------------------------------------------------------

pub type TestService = SearchService<MemoryStore>;

/// Service over `items` with the built-in defaults.
pub fn service(items: impl IntoIterator<Item = Item>) -> TestService {
    service_with(items, Config::defaults())
}

pub fn service_with(items: impl IntoIterator<Item = Item>, config: Config) -> TestService {
    SearchService::new(
        MemoryStore::from_items(items),
        Arc::new(config.registry().expect("test config registry")),
        Arc::new(config.settings().expect("test config settings")),
    )
}

/// Parse a request from a `json!` literal.
pub fn request(value: Value) -> SearchRequest {
    serde_json::from_value(value).expect("invalid search request literal")
}

// ---------------------------------------------------------------------------
// Walking pages
// ---------------------------------------------------------------------------

/// Follow `next` tokens from the first page until none is issued. Returns
/// every page in order.
pub async fn walk_forward(service: &TestService, first: &SearchRequest) -> Result<Vec<SearchResponse>, SearchError> {
    let mut pages = vec![service.search(first).await?];
    while let Some(token) = pages.last().and_then(|p| p.next_token.clone()) {
        let next = SearchRequest {
            token: Some(token),
            ..first.clone()
        };
        pages.push(service.search(&next).await?);
        assert!(pages.len() < 10_000, "pagination did not terminate");
    }
    Ok(pages)
}

/// Follow `previous` tokens starting from `page` until none is issued.
pub async fn walk_backward(
    service: &TestService,
    base: &SearchRequest,
    page: &SearchResponse,
) -> Result<Vec<SearchResponse>, SearchError> {
    let mut pages = Vec::new();
    let mut token = page.previous_token.clone();
    while let Some(t) = token {
        let previous = SearchRequest {
            token: Some(t),
            ..base.clone()
        };
        let response = service.search(&previous).await?;
        token = response.previous_token.clone();
        pages.push(response);
        assert!(pages.len() < 10_000, "pagination did not terminate");
    }
    Ok(pages)
}

/// Feature ids of a response, in order.
pub fn feature_ids(response: &SearchResponse) -> Vec<String> {
    response
        .features
        .iter()
        .map(|f| f["id"].as_str().expect("feature without id").to_string())
        .collect()
}
