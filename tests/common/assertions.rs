//! Domain-specific assertion macros for geocat harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! make it clear which page and which token a failure came from.

// ---------------------------------------------------------------------------
// Page contents
// ---------------------------------------------------------------------------

/// Assert the feature ids of a response, in order.
///
/// ```rust
/// assert_ids!(response, ["a", "b"]);
/// ```
#[macro_export]
macro_rules! assert_ids {
    ($response:expr, [$($id:expr),* $(,)?]) => {{
        let response: &geocat_core::SearchResponse = &$response;
        let expected: Vec<String> = vec![$($id.to_string()),*];
        pretty_assertions::assert_eq!(
            $crate::common::builders::feature_ids(response),
            expected,
            "assert_ids! failed on page with next={:?} previous={:?}",
            response.next_token,
            response.previous_token
        );
    }};
}

// ---------------------------------------------------------------------------
// Tokens and links
// ---------------------------------------------------------------------------

/// Assert which continuation tokens a page carries, and that its `links`
/// agree.
///
/// ```rust
/// assert_tokens!(response, next: true, previous: false);
/// ```
#[macro_export]
macro_rules! assert_tokens {
    ($response:expr, next: $next:expr, previous: $previous:expr) => {{
        let response: &geocat_core::SearchResponse = &$response;
        let next: bool = $next;
        let previous: bool = $previous;
        if response.next_token.is_some() != next || response.previous_token.is_some() != previous {
            panic!(
                "assert_tokens! failed:\n  expected: next={} previous={}\n  actual:   next={} previous={}\n  ids: {:?}",
                next,
                previous,
                response.next_token.is_some(),
                response.previous_token.is_some(),
                $crate::common::builders::feature_ids(response)
            );
        }
        let rels: Vec<geocat_core::links::LinkRel> = response.links.iter().map(|l| l.rel).collect();
        let mut expected_rels = Vec::new();
        if next {
            expected_rels.push(geocat_core::links::LinkRel::Next);
        }
        if previous {
            expected_rels.push(geocat_core::links::LinkRel::Previous);
        }
        pretty_assertions::assert_eq!(rels, expected_rels, "assert_tokens! links disagree with tokens");
    }};
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Assert that a result is a specific `SearchError` variant.
///
/// ```rust
/// assert_search_err!(result, SearchError::InvalidToken { .. });
/// ```
#[macro_export]
macro_rules! assert_search_err {
    ($result:expr, $pattern:pat) => {{
        match $result {
            Err(ref e) if matches!(e, $pattern) => {}
            Err(e) => panic!(
                "assert_search_err! failed:\n  expected: {}\n  actual:   {:?}",
                stringify!($pattern),
                e
            ),
            Ok(_) => panic!(
                "assert_search_err! failed: expected {}, got Ok",
                stringify!($pattern)
            ),
        }
    }};
}
