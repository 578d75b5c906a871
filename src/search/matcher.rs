//! Text-matching strategies for the fallback path.

use std::fmt;
use std::sync::Arc;

/// Caller-supplied text matching.
pub trait TextMatcher: Send + Sync {
    /// Returns `true` when `text` matches `query`.
    fn matches(&self, text: &str, query: &str) -> bool;
}

impl<F> TextMatcher for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn matches(&self, text: &str, query: &str) -> bool {
        self(text, query)
    }
}

/// How the text fallback decides that an item matches a query.
///
/// The built-in strategies compare case-insensitively.
#[derive(Clone, Default)]
pub enum MatchStrategy {
    /// `text` contains `query` anywhere.
    #[default]
    Contains,
    /// `text` starts with `query`.
    StartsWith,
    /// Some whitespace-separated word of `text` starts with `query`.
    WordPrefix,
    Custom(Arc<dyn TextMatcher>),
}

impl MatchStrategy {
    pub fn custom(matcher: impl TextMatcher + 'static) -> Self {
        MatchStrategy::Custom(Arc::new(matcher))
    }

    pub fn matches(&self, text: &str, query: &str) -> bool {
        if let MatchStrategy::Custom(matcher) = self {
            return matcher.matches(text, query);
        }

        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }
        let text = text.to_lowercase();

        match self {
            MatchStrategy::Contains => text.contains(&query),
            MatchStrategy::StartsWith => text.trim_start().starts_with(&query),
            MatchStrategy::WordPrefix => text.split_whitespace().any(|w| w.starts_with(&query)),
            MatchStrategy::Custom(_) => false,
        }
    }
}

impl fmt::Debug for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Contains => f.write_str("Contains"),
            MatchStrategy::StartsWith => f.write_str("StartsWith"),
            MatchStrategy::WordPrefix => f.write_str("WordPrefix"),
            MatchStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
