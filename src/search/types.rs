use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Pure functions that map an item to its searchable text and its cache identity.
pub struct ItemAccessors<T> {
    text: Arc<dyn Fn(&T) -> String + Send + Sync>,
    key: Arc<dyn Fn(&T) -> String + Send + Sync>,
}

impl<T> ItemAccessors<T> {
    pub fn new<FT, FK>(text: FT, key: FK) -> Self
    where
        FT: Fn(&T) -> String + Send + Sync + 'static,
        FK: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            text: Arc::new(text),
            key: Arc::new(key),
        }
    }

    #[inline]
    pub fn text_of(&self, item: &T) -> String {
        (self.text)(item)
    }

    #[inline]
    pub fn key_of(&self, item: &T) -> String {
        (self.key)(item)
    }
}

impl ItemAccessors<String> {
    /// Plain strings: the text is its own key.
    pub fn identity() -> Self {
        Self::new(|s: &String| s.clone(), |s: &String| s.clone())
    }
}

impl<T> Clone for ItemAccessors<T> {
    fn clone(&self) -> Self {
        Self {
            text: Arc::clone(&self.text),
            key: Arc::clone(&self.key),
        }
    }
}

impl<T> fmt::Debug for ItemAccessors<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemAccessors").finish_non_exhaustive()
    }
}

/// Where a result's score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    /// Cosine similarity above the threshold.
    Semantic,
    /// Text fallback at the fixed fallback score.
    TextFallback,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Semantic => "semantic",
            MatchSource::TextFallback => "text",
        }
    }
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked item.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<T> {
    pub item: T,
    pub similarity: f32,
    pub source: MatchSource,
}

/// How a search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    Completed,
    /// Blank query; nothing was looked up.
    EmptyQuery,
    /// No limiter token; the provider was not called.
    RateLimited { retry_after: Duration },
    /// The query embedding failed. `message` is already redacted.
    ProviderFailed { message: String },
    /// The caller cancelled; results gathered so far are kept.
    Cancelled,
}

impl SearchStatus {
    /// User-facing message for failure states, `None` otherwise.
    pub fn message(&self) -> Option<String> {
        match self {
            SearchStatus::RateLimited { .. } | SearchStatus::ProviderFailed { .. } => {
                Some(self.to_string())
            }
            _ => None,
        }
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, SearchStatus::Completed)
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStatus::Completed => write!(f, "completed"),
            SearchStatus::EmptyQuery => write!(f, "empty query"),
            SearchStatus::RateLimited { retry_after } => write!(
                f,
                "rate limited, retry after {:.1}s",
                retry_after.as_secs_f64()
            ),
            SearchStatus::ProviderFailed { message } => {
                write!(f, "semantic search unavailable: {}", message)
            }
            SearchStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Results of one search plus how it ended.
#[derive(Debug, Clone)]
pub struct SearchOutcome<T> {
    pub results: Vec<SearchResult<T>>,
    pub status: SearchStatus,
}

impl<T> SearchOutcome<T> {
    pub(crate) fn empty(status: SearchStatus) -> Self {
        Self {
            results: Vec::new(),
            status,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The ranked items without their scores.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.results.iter().map(|r| &r.item)
    }
}

/// Summary of a pre-warm run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrewarmReport {
    pub total: usize,
    /// Items whose embedding was computed and stored by this run.
    pub embedded: usize,
    /// Items that already had a live cache entry.
    pub already_cached: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl PrewarmReport {
    pub(crate) fn absorb(&mut self, batch: &PrewarmReport) {
        self.embedded += batch.embedded;
        self.already_cached += batch.already_cached;
        self.failed += batch.failed;
        self.cancelled |= batch.cancelled;
    }
}
