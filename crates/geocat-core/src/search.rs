//! Search orchestrator: request in, page out.
//!
//! ```text
//! SearchRequest ─► plan() ─────────────────────────────► SearchPlan
//!                  │ limit + capabilities                  │
//!                  │ ids short-circuit │ query/spatial/time │
//!                  │ sort resolution                       │
//!                  └ token decode                          ▼
//!                                          Store::scan(limit + 1) ─► paginate
//!                                          Store::count (optional)     │
//!                                                                      ▼
//!                                          project ─► SearchResponse envelope
//! ```
//!
//! Everything up to the scan is pure, so client errors never reach the
//! store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::SearchSettings;
use crate::error::{Capability, SearchError};
use crate::links::{path_segment, Link, LinkRel};
use crate::pagination::{Base64JsonCodec, Cursor, Page, Paginator, TokenCodec};
use crate::projection::{FieldProjector, FieldsRequest, ProjectionSpec};
use crate::query::{compile_query, spatial_predicate, DatetimeFilter, Predicate, QueryFilter};
use crate::registry::FieldRegistry;
use crate::sort::{resolve_sort, SortBy, SortOrder};
use crate::store::{ScanRequest, Store};
use crate::types::{Item, SortDirection};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A search as posted in a JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Absent means every collection.
    pub collections: Option<BTreeSet<String>>,
    /// When non-empty, spatial, temporal and `query` filters are ignored.
    pub ids: Option<Vec<String>>,
    /// `[minx, miny, maxx, maxy]`.
    pub bbox: Option<Vec<f64>>,
    pub intersects: Option<geojson::Geometry>,
    pub datetime: Option<String>,
    pub query: Option<QueryFilter>,
    pub sortby: Option<Vec<SortBy>>,
    pub limit: Option<u64>,
    pub token: Option<String>,
    pub fields: Option<FieldsRequest>,
}

/// A search as written in a query string. Every value is kept raw so the
/// pagination links can echo it back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetSearchParams {
    pub collections: Option<String>,
    pub ids: Option<String>,
    pub bbox: Option<String>,
    pub intersects: Option<String>,
    pub datetime: Option<String>,
    pub limit: Option<String>,
    pub query: Option<String>,
    pub sortby: Option<String>,
    pub fields: Option<String>,
    pub token: Option<String>,
}

impl GetSearchParams {
    pub fn to_request(&self) -> Result<SearchRequest, SearchError> {
        let mut request = SearchRequest {
            collections: self
                .collections
                .as_deref()
                .map(|raw| split_list(raw).map(str::to_string).collect::<BTreeSet<_>>())
                .filter(|set| !set.is_empty()),
            ids: self
                .ids
                .as_deref()
                .map(|raw| split_list(raw).map(str::to_string).collect::<Vec<_>>())
                .filter(|ids| !ids.is_empty()),
            datetime: self.datetime.clone(),
            token: self.token.clone(),
            ..SearchRequest::default()
        };

        if let Some(raw) = &self.bbox {
            let bounds = split_list(raw)
                .map(|v| v.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| SearchError::invalid_parameter("bbox", e.to_string()))?;
            request.bbox = Some(bounds);
        }
        if let Some(raw) = &self.intersects {
            request.intersects = Some(
                serde_json::from_str(raw)
                    .map_err(|e| SearchError::invalid_parameter("intersects", e.to_string()))?,
            );
        }
        if let Some(raw) = &self.limit {
            request.limit = Some(
                raw.trim()
                    .parse()
                    .map_err(|_| SearchError::invalid_parameter("limit", format!("'{raw}' is not a positive integer")))?,
            );
        }
        if let Some(raw) = &self.query {
            request.query = Some(
                serde_json::from_str(raw)
                    .map_err(|e| SearchError::invalid_parameter("query", e.to_string()))?,
            );
        }
        if let Some(raw) = &self.sortby {
            request.sortby = Some(parse_sortby(raw)?);
        }
        if let Some(raw) = &self.fields {
            request.fields = Some(parse_fields(raw)?);
        }
        Ok(request)
    }

    /// The parameters that were set, in a fixed order.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("collections", &self.collections),
            ("ids", &self.ids),
            ("bbox", &self.bbox),
            ("intersects", &self.intersects),
            ("datetime", &self.datetime),
            ("limit", &self.limit),
            ("query", &self.query),
            ("sortby", &self.sortby),
            ("fields", &self.fields),
            ("token", &self.token),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

// A literal `+` arrives as a space once the query string is decoded, so a
// leading space reads as ascending too.
fn parse_sortby(raw: &str) -> Result<Vec<SortBy>, SearchError> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|entry| {
            let entry = entry.trim();
            let (direction, field) = match entry.strip_prefix('-') {
                Some(field) => (SortDirection::Desc, field),
                None => (SortDirection::Asc, entry.strip_prefix('+').unwrap_or(entry)),
            };
            if field.is_empty() {
                return Err(SearchError::invalid_parameter("sortby", format!("'{entry}' names no field")));
            }
            Ok(SortBy {
                field: field.to_string(),
                direction,
            })
        })
        .collect()
}

fn parse_fields(raw: &str) -> Result<FieldsRequest, SearchError> {
    let mut fields = FieldsRequest::default();
    for entry in split_list(raw) {
        let (target, path) = match entry.strip_prefix('-') {
            Some(path) => (&mut fields.exclude, path),
            None => (&mut fields.include, entry.strip_prefix('+').unwrap_or(entry)),
        };
        if path.is_empty() {
            return Err(SearchError::invalid_parameter("fields", format!("'{entry}' names no field")));
        }
        target.insert(path.to_string());
    }
    Ok(fields)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchContext {
    pub returned: usize,
    pub limit: u64,
    /// Absent when the count failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<MatchContext>,
    pub features: Vec<Value>,
    pub links: Vec<Link>,
    /// Union of the returned features' extents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    #[serde(skip)]
    pub next_token: Option<String>,
    #[serde(skip)]
    pub previous_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Everything decided before touching the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub predicates: Vec<Predicate>,
    pub order: SortOrder,
    pub cursor: Option<Cursor>,
    /// Page size; the scan asks for one more.
    pub limit: u64,
    /// `None` returns records whole.
    pub projection: Option<ProjectionSpec>,
}

impl SearchPlan {
    pub fn scan_request(&self) -> ScanRequest {
        let (order, seek) = match &self.cursor {
            Some(cursor) => (cursor.scan_order(&self.order), Some(cursor.seek(&self.order))),
            None => (self.order.clone(), None),
        };
        ScanRequest {
            predicates: self.predicates.clone(),
            order,
            seek,
            limit: usize::try_from(self.limit).unwrap_or(usize::MAX).saturating_add(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct SearchService<S, C = Base64JsonCodec> {
    store: S,
    registry: Arc<FieldRegistry>,
    settings: Arc<SearchSettings>,
    paginator: Paginator<C>,
    projector: FieldProjector,
}

impl<S: Store> SearchService<S> {
    pub fn new(store: S, registry: Arc<FieldRegistry>, settings: Arc<SearchSettings>) -> Self {
        Self::with_codec(store, registry, settings, Base64JsonCodec)
    }
}

impl<S: Store, C: TokenCodec> SearchService<S, C> {
    pub fn with_codec(
        store: S,
        registry: Arc<FieldRegistry>,
        settings: Arc<SearchSettings>,
        codec: C,
    ) -> Self {
        let projector = FieldProjector::new(settings.default_includes.iter().cloned());
        Self {
            store,
            registry,
            settings,
            paginator: Paginator::new(codec),
            projector,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Validate and compile `request` without any I/O.
    pub fn plan(&self, request: &SearchRequest) -> Result<SearchPlan, SearchError> {
        let limit = self.check_limit(request.limit)?;

        let sortby = request.sortby.as_deref().unwrap_or_default();
        let query = request.query.as_ref().filter(|q| !q.is_empty());
        let fields = request.fields.as_ref().filter(|f| !f.is_empty());
        self.require(Capability::Sort, !sortby.is_empty())?;
        self.require(Capability::Query, query.is_some())?;
        self.require(Capability::Fields, fields.is_some())?;

        let mut predicates = Vec::new();
        if let Some(collections) = request.collections.as_ref().filter(|c| !c.is_empty()) {
            predicates.push(Predicate::Collections(collections.clone()));
        }

        let mut predicate_paths = BTreeSet::new();
        let order = match request.ids.as_ref().filter(|ids| !ids.is_empty()) {
            Some(ids) => {
                predicates.push(Predicate::Ids(ids.clone()));
                SortOrder::by_id(&self.registry)
            }
            None => {
                let bbox = request
                    .bbox
                    .as_deref()
                    .map(|b| {
                        <[f64; 4]>::try_from(b).map_err(|_| SearchError::InvalidSpatialFilter {
                            reason: format!("bbox needs 4 values, got {}", b.len()),
                        })
                    })
                    .transpose()?;
                predicates.extend(spatial_predicate(bbox.as_ref(), request.intersects.as_ref())?);

                if let Some(raw) = &request.datetime {
                    let filter = DatetimeFilter::parse(raw)?;
                    predicates.extend(
                        filter
                            .predicates(self.registry.temporal_field())
                            .into_iter()
                            .map(Predicate::Compare),
                    );
                }

                if let Some(query) = query {
                    for compiled in compile_query(query, &self.registry)? {
                        predicate_paths.insert(compiled.field.path.clone());
                        predicates.push(Predicate::Compare(compiled));
                    }
                }

                resolve_sort(sortby, &self.registry)?
            }
        };

        let cursor = request
            .token
            .as_deref()
            .map(|raw| self.paginator.decode(raw, &order))
            .transpose()?;

        let projection = self.settings.capabilities.fields.then(|| {
            self.projector
                .resolve(fields.unwrap_or(&FieldsRequest::default()), &predicate_paths)
        });

        tracing::debug!(
            predicates = predicates.len(),
            order = %order.canonical(),
            direction = ?cursor.as_ref().map(|c| c.direction),
            limit,
            "compiled search plan"
        );
        Ok(SearchPlan {
            predicates,
            order,
            cursor,
            limit,
            projection,
        })
    }

    /// POST-style search; links resend the body with the new token.
    #[tracing::instrument(skip_all, fields(limit = request.limit, token = request.token.is_some()))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let plan = self.plan(request)?;
        let (page, context) = self.execute(&plan).await?;
        let base = self.settings.base_url.as_str();
        self.envelope(&plan, page, context, |rel, token| Link::post(rel, base, token))
    }

    /// GET-style search; links repeat the query string with the new token.
    #[tracing::instrument(skip_all, fields(limit = params.limit.as_deref(), token = params.token.is_some()))]
    pub async fn get_search(&self, params: &GetSearchParams) -> Result<SearchResponse, SearchError> {
        let plan = self.plan(&params.to_request()?)?;
        let (page, context) = self.execute(&plan).await?;
        let base = self.settings.base_url.as_str();
        let pairs = params.query_pairs();
        self.envelope(&plan, page, context, |rel, token| {
            Link::get(rel, base, "search", pairs.iter().copied(), token)
        })
    }

    /// Items of one collection, newest first, records returned whole.
    #[tracing::instrument(skip(self, token))]
    pub async fn item_collection(
        &self,
        collection: &str,
        limit: Option<u64>,
        token: Option<&str>,
    ) -> Result<SearchResponse, SearchError> {
        let limit = self.check_limit(limit)?;
        let order = SortOrder::default_for(&self.registry);
        let cursor = token.map(|raw| self.paginator.decode(raw, &order)).transpose()?;
        let plan = SearchPlan {
            predicates: vec![Predicate::Collections(BTreeSet::from([collection.to_string()]))],
            order,
            cursor,
            limit,
            projection: None,
        };

        let (page, context) = self.execute(&plan).await?;
        let base = self.settings.base_url.as_str();
        let path = format!("collections/{}/items", path_segment(collection));
        let limit = limit.to_string();
        self.envelope(&plan, page, context, |rel, token| {
            Link::get(rel, base, &path, [("limit", limit.as_str())], token)
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_item(&self, id: &str) -> Result<Item, SearchError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| SearchError::NotFound { id: id.to_string() })
    }

    fn check_limit(&self, limit: Option<u64>) -> Result<u64, SearchError> {
        let limit = limit.unwrap_or(self.settings.default_limit);
        if limit == 0 || limit > self.settings.max_limit {
            return Err(SearchError::LimitOutOfRange {
                limit,
                max: self.settings.max_limit,
            });
        }
        Ok(limit)
    }

    fn require(&self, capability: Capability, used: bool) -> Result<(), SearchError> {
        if used && !self.settings.capabilities.is_enabled(capability) {
            return Err(SearchError::CapabilityDisabled { capability });
        }
        Ok(())
    }

    async fn execute(&self, plan: &SearchPlan) -> Result<(Page, Option<MatchContext>), SearchError> {
        let rows = self.store.scan(&plan.scan_request()).await?;
        let page_size = usize::try_from(plan.limit).unwrap_or(usize::MAX);
        let page = self
            .paginator
            .paginate(rows, page_size, &plan.order, plan.cursor.as_ref())?;

        if !self.settings.capabilities.context {
            return Ok((page, None));
        }
        let (matched, partial) = match self.store.count(&plan.predicates).await {
            Ok(n) => (Some(n), false),
            Err(e) => {
                tracing::warn!(error = %e, "count failed, returning page without match statistics");
                (None, true)
            }
        };
        let context = MatchContext {
            returned: page.items.len(),
            limit: plan.limit,
            matched,
            partial,
        };
        Ok((page, Some(context)))
    }

    fn envelope(
        &self,
        plan: &SearchPlan,
        page: Page,
        context: Option<MatchContext>,
        link: impl Fn(LinkRel, &str) -> Link,
    ) -> Result<SearchResponse, SearchError> {
        let links = [(LinkRel::Next, &page.next), (LinkRel::Previous, &page.previous)]
            .into_iter()
            .filter_map(|(rel, token)| token.as_deref().map(|t| link(rel, t)))
            .collect();

        let bbox = page
            .items
            .iter()
            .filter_map(Item::bounds)
            .reduce(|[a0, a1, a2, a3], [b0, b1, b2, b3]| {
                [a0.min(b0), a1.min(b1), a2.max(b2), a3.max(b3)]
            });

        let features = page
            .items
            .iter()
            .map(|item| {
                let record = serde_json::to_value(item)?;
                Ok(match &plan.projection {
                    Some(spec) => spec.apply(record),
                    None => record,
                })
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        Ok(SearchResponse {
            kind: "FeatureCollection".to_string(),
            context,
            features,
            links,
            bbox,
            next_token: page.next,
            previous_token: page.previous,
        })
    }
}
