//! Catalog navigation: landing page, conformance and collection records.
//!
//! Nothing here pages. Collections are few, so they are listed whole, and
//! every record leaves with its `self`, `parent`, `root` and `items` links
//! rewritten against the configured base URL.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::links::{path_segment, Link, LinkRel, GEOJSON_MEDIA_TYPE, JSON_MEDIA_TYPE};
use crate::pagination::TokenCodec;
use crate::search::SearchService;
use crate::store::Store;
use crate::types::Collection;

const CORE_CONFORMANCE: [&str; 2] = [
    "https://stacspec.org/STAC-api.html",
    "http://docs.opengeospatial.org/is/17-069r3/17-069r3.html#ats_geojson",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingPage {
    pub title: String,
    pub description: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conformance {
    #[serde(rename = "conformsTo")]
    pub conforms_to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionList {
    pub collections: Vec<Collection>,
    pub links: Vec<Link>,
}

impl<S: Store, C: TokenCodec> SearchService<S, C> {
    /// Root document: links to conformance, search and every collection.
    #[tracing::instrument(skip(self))]
    pub async fn landing_page(&self) -> Result<LandingPage, SearchError> {
        let settings = self.settings();
        let base = settings.base_url.as_str();
        let mut links = vec![
            Link::nav(LinkRel::Itself, JSON_MEDIA_TYPE, format!("{base}/")),
            Link::nav(LinkRel::Conformance, JSON_MEDIA_TYPE, format!("{base}/conformance"))
                .titled("conformance classes implemented by this server"),
            Link::nav(LinkRel::Search, GEOJSON_MEDIA_TYPE, format!("{base}/search")).titled("search"),
        ];
        for collection in self.store().collections().await? {
            let mut child = Link::nav(LinkRel::Child, JSON_MEDIA_TYPE, collection_href(base, &collection.id));
            child.title = collection.title;
            links.push(child);
        }
        Ok(LandingPage {
            title: settings.title.clone(),
            description: settings.description.clone(),
            links,
        })
    }

    /// Conformance classes; search extensions are listed only while enabled.
    pub fn conformance(&self) -> Conformance {
        let capabilities = &self.settings().capabilities;
        let extensions = [
            (capabilities.context, "context"),
            (capabilities.fields, "fields"),
            (capabilities.sort, "sort"),
            (capabilities.query, "query"),
        ];
        let conforms_to = CORE_CONFORMANCE
            .iter()
            .map(|uri| uri.to_string())
            .chain(
                extensions
                    .into_iter()
                    .filter(|(enabled, _)| *enabled)
                    .map(|(_, name)| format!("https://api.stacspec.org/v1.0.0/item-search#{name}")),
            )
            .collect();
        Conformance { conforms_to }
    }

    #[tracing::instrument(skip(self))]
    pub async fn all_collections(&self) -> Result<CollectionList, SearchError> {
        let base = self.settings().base_url.as_str();
        let collections = self
            .store()
            .collections()
            .await?
            .into_iter()
            .map(|c| with_links(c, base))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CollectionList {
            collections,
            links: vec![
                Link::nav(LinkRel::Itself, JSON_MEDIA_TYPE, format!("{base}/collections")),
                Link::nav(LinkRel::Root, JSON_MEDIA_TYPE, format!("{base}/")),
            ],
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_collection(&self, id: &str) -> Result<Collection, SearchError> {
        let collection = self
            .store()
            .get_collection(id)
            .await?
            .ok_or_else(|| SearchError::CollectionNotFound { id: id.to_string() })?;
        with_links(collection, &self.settings().base_url)
    }
}

fn collection_href(base: &str, id: &str) -> String {
    format!("{base}/collections/{}", path_segment(id))
}

/// Replace the navigation links of `collection`, keeping any others.
fn with_links(mut collection: Collection, base: &str) -> Result<Collection, SearchError> {
    const GENERATED: [&str; 4] = ["self", "parent", "root", "items"];
    collection
        .links
        .retain(|link| !link["rel"].as_str().is_some_and(|rel| GENERATED.contains(&rel)));

    let href = collection_href(base, &collection.id);
    for link in [
        Link::nav(LinkRel::Itself, JSON_MEDIA_TYPE, href.clone()),
        Link::nav(LinkRel::Parent, JSON_MEDIA_TYPE, format!("{base}/")),
        Link::nav(LinkRel::Root, JSON_MEDIA_TYPE, format!("{base}/")),
        Link::nav(LinkRel::Items, GEOJSON_MEDIA_TYPE, format!("{href}/items")),
    ] {
        collection.links.push(serde_json::to_value(link)?);
    }
    Ok(collection)
}
