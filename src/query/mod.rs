//! Search query construction
//!
//! The search API caps every query at a fixed number of results. To collect
//! more than that, the search space is split into disjoint facets
//! (language × creation window × popularity range) and each facet becomes
//! its own query.

mod facet;
mod partition;

pub use facet::{SearchFacet, StarRange, TimeWindow};
pub use partition::{build_queries, FacetDimensions};

use std::fmt;
use std::sync::Arc;

/// An immutable search expression for one facet
///
/// Cloning is cheap; every pagination unit of a query shares the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    text: Arc<str>,
}

impl SearchQuery {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_facet(facet: &SearchFacet) -> Self {
        Self::new(facet.search_text())
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
