//! Catalog file loaders.
//!
//! Two layouts are understood:
//!
//! - a GeoJSON `FeatureCollection` whose `features` are items;
//! - newline-delimited JSON, one item per line (`.ndjson` / `.jsonl`).
//!
//! Blank lines in NDJSON files are skipped. Collection records come from a
//! separate JSON file, either a bare array or `{"collections": [...]}`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncBufReadExt;

use geocat_core::{Collection, Item};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a FeatureCollection: {source}")]
    Collection {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} does not hold collection records: {source}")]
    Collections {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}:{line}: {source}")]
    Line {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Item>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CollectionFile {
    Bare(Vec<Collection>),
    Wrapped { collections: Vec<Collection> },
}

/// Load by extension: `.ndjson`/`.jsonl` line by line, anything else as a
/// FeatureCollection.
pub async fn load_catalog(path: &Path) -> Result<Vec<Item>, LoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ndjson" | "jsonl") => load_ndjson(path).await,
        _ => load_feature_collection(path).await,
    }
}

pub async fn load_feature_collection(path: &Path) -> Result<Vec<Item>, LoadError> {
    let raw = tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let collection: FeatureCollection =
        serde_json::from_slice(&raw).map_err(|source| LoadError::Collection {
            path: path.to_path_buf(),
            source,
        })?;
    if collection.kind != "FeatureCollection" {
        tracing::warn!(path = %path.display(), kind = %collection.kind, "unexpected collection type");
    }
    tracing::debug!(path = %path.display(), items = collection.features.len(), "loaded feature collection");
    Ok(collection.features)
}

pub async fn load_ndjson(path: &Path) -> Result<Vec<Item>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = tokio::fs::File::open(path).await.map_err(io_err)?;
    let mut lines = tokio::io::BufReader::new(file).lines();

    let mut items = Vec::new();
    let mut line = 0;
    while let Some(text) = lines.next_line().await.map_err(io_err)? {
        line += 1;
        if text.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&text).map_err(|source| LoadError::Line {
            path: path.to_path_buf(),
            line,
            source,
        })?;
        items.push(item);
    }
    tracing::debug!(path = %path.display(), items = items.len(), "loaded item lines");
    Ok(items)
}

pub async fn load_collections(path: &Path) -> Result<Vec<Collection>, LoadError> {
    let raw = tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: CollectionFile = serde_json::from_slice(&raw).map_err(|source| LoadError::Collections {
        path: path.to_path_buf(),
        source,
    })?;
    let collections = match file {
        CollectionFile::Bare(collections) | CollectionFile::Wrapped { collections } => collections,
    };
    tracing::debug!(path = %path.display(), collections = collections.len(), "loaded collections");
    Ok(collections)
}
