//! HTTP adapter over [`SearchService`].
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | [`SearchService::landing_page`] |
//! | `GET /conformance` | [`SearchService::conformance`] |
//! | `GET /collections` | [`SearchService::all_collections`] |
//! | `GET /collections/{collection}` | [`SearchService::get_collection`] |
//! | `POST /search` | [`SearchService::search`] |
//! | `GET /search` | [`SearchService::get_search`] |
//! | `GET /collections/{collection}/items` | [`SearchService::item_collection`] |
//! | `GET /collections/{collection}/items/{item}` | [`SearchService::get_item`] |
//!
//! Client errors (malformed JSON bodies included) map to 400, unknown items
//! and collections to 404, an unreachable store to 503 and anything else to
//! 500.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use geocat_core::{
    Collection, CollectionList, Conformance, GetSearchParams, Item, LandingPage, SearchError, SearchRequest,
    SearchResponse, SearchService, Store,
};

pub fn router<S: Store + 'static>(service: Arc<SearchService<S>>) -> Router {
    Router::new()
        .route("/", get(landing_page::<S>))
        .route("/conformance", get(conformance::<S>))
        .route("/collections", get(all_collections::<S>))
        .route("/collections/{collection}", get(get_collection::<S>))
        .route("/search", get(get_search::<S>).post(post_search::<S>))
        .route("/collections/{collection}/items", get(item_collection::<S>))
        .route("/collections/{collection}/items/{item}", get(get_item::<S>))
        .with_state(service)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// [`SearchError`] rendered as `{"code": .., "description": ..}`.
#[derive(Debug)]
pub struct ApiError(pub SearchError);

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(SearchError::invalid_parameter("body", rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            SearchError::NotFound { .. } | SearchError::CollectionNotFound { .. } => StatusCode::NOT_FOUND,
            SearchError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "search failed");
        }
        let body = serde_json::json!({
            "code": status.canonical_reason().unwrap_or("Error"),
            "description": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

type Service<S> = State<Arc<SearchService<S>>>;

async fn landing_page<S: Store>(State(service): Service<S>) -> Result<Json<LandingPage>, ApiError> {
    Ok(Json(service.landing_page().await?))
}

async fn conformance<S: Store>(State(service): Service<S>) -> Json<Conformance> {
    Json(service.conformance())
}

async fn all_collections<S: Store>(State(service): Service<S>) -> Result<Json<CollectionList>, ApiError> {
    Ok(Json(service.all_collections().await?))
}

async fn get_collection<S: Store>(
    State(service): Service<S>,
    Path(collection): Path<String>,
) -> Result<Json<Collection>, ApiError> {
    Ok(Json(service.get_collection(&collection).await?))
}

async fn post_search<S: Store>(
    State(service): Service<S>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = body?;
    Ok(Json(service.search(&request).await?))
}

async fn get_search<S: Store>(
    State(service): Service<S>,
    Query(params): Query<GetSearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    Ok(Json(service.get_search(&params).await?))
}

#[derive(Debug, Default, Deserialize)]
struct ItemsParams {
    limit: Option<u64>,
    token: Option<String>,
}

async fn item_collection<S: Store>(
    State(service): Service<S>,
    Path(collection): Path<String>,
    Query(params): Query<ItemsParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let page = service
        .item_collection(&collection, params.limit, params.token.as_deref())
        .await?;
    Ok(Json(page))
}

async fn get_item<S: Store>(
    State(service): Service<S>,
    Path((collection, item)): Path<(String, String)>,
) -> Result<Json<Item>, ApiError> {
    let found = service.get_item(&item).await?;
    if found.collection != collection {
        return Err(SearchError::NotFound { id: item }.into());
    }
    Ok(Json(found))
}
