//! Semantic search engine with a text-matching fallback.
//!
//! - [`SemanticSearchEngine`] ranks items by embedding similarity.
//! - [`MatchStrategy`] decides text-fallback matches.
//! - [`SearchOutcome`] carries ranked [`SearchResult`]s plus a [`SearchStatus`].

mod engine;
mod error;
mod matcher;
mod prewarm;
mod types;

#[cfg(test)]
mod tests;

pub use engine::SemanticSearchEngine;
pub use error::SearchError;
pub use matcher::{MatchStrategy, TextMatcher};
pub use types::{
    ItemAccessors, MatchSource, PrewarmReport, SearchOutcome, SearchResult, SearchStatus,
};
