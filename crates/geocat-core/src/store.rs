//! The store collaborator: executes logical scans and counts.
//!
//! The core never plans physical access. A [`ScanRequest`] is the whole
//! contract: every row must satisfy all `predicates` and the `seek` (when
//! present), rows come back in `order`, at most `limit` of them. Collections
//! are looked up directly; there are few of them and they are never paged.

use std::future::Future;
use std::sync::Arc;

use crate::error::StoreError;
use crate::pagination::SeekPredicate;
use crate::query::Predicate;
use crate::sort::SortOrder;
use crate::types::{Collection, Item};

#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub predicates: Vec<Predicate>,
    /// Order to scan in. For a backward page this is already reversed.
    pub order: SortOrder,
    pub seek: Option<SeekPredicate>,
    pub limit: usize,
}

impl ScanRequest {
    /// Whether `item` satisfies the filters and the seek.
    pub fn admits(&self, item: &Item) -> bool {
        crate::query::matches_all(&self.predicates, item)
            && self.seek.as_ref().is_none_or(|seek| seek.admits(item))
    }
}

pub trait Store: Send + Sync {
    fn scan(&self, request: &ScanRequest) -> impl Future<Output = Result<Vec<Item>, StoreError>> + Send;

    /// Rows matching `predicates`, ignoring order, seek and limit.
    fn count(&self, predicates: &[Predicate]) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Item>, StoreError>> + Send;

    /// Every collection, in id order.
    fn collections(&self) -> impl Future<Output = Result<Vec<Collection>, StoreError>> + Send;

    fn get_collection(&self, id: &str) -> impl Future<Output = Result<Option<Collection>, StoreError>> + Send;
}

impl<T: Store> Store for Arc<T> {
    fn scan(&self, request: &ScanRequest) -> impl Future<Output = Result<Vec<Item>, StoreError>> + Send {
        (**self).scan(request)
    }

    fn count(&self, predicates: &[Predicate]) -> impl Future<Output = Result<u64, StoreError>> + Send {
        (**self).count(predicates)
    }

    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Item>, StoreError>> + Send {
        (**self).get(id)
    }

    fn collections(&self) -> impl Future<Output = Result<Vec<Collection>, StoreError>> + Send {
        (**self).collections()
    }

    fn get_collection(&self, id: &str) -> impl Future<Output = Result<Option<Collection>, StoreError>> + Send {
        (**self).get_collection(id)
    }
}
