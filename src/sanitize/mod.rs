//! Allow-list validation for values written into generated stylesheets.
//!
//! Every check returns the input unchanged when it is valid and `None` otherwise; a value
//! is never partially cleaned. The pipeline for one call runs in this order:
//!
//! 1. reject inputs longer than [`SanitizerConfig::max_len`] before any matching,
//! 2. normalize obfuscation (NFKC, Unicode dashes, URL escapes, HTML entities),
//! 3. reject dangerous substrings in the raw or the normalized text,
//! 4. apply the grammar for the value kind, range-checking color numbers,
//! 5. reject when the pattern-matching budget ([`SanitizerConfig::regex_timeout`]) runs out.
//!
//! The module also hosts the text helpers used on the embedding path:
//! [`clean_input_text`], [`redact_secrets`] and [`truncate_for_log`].

mod color;
mod font;
mod guard;
mod length;
mod normalize;
mod redact;
mod shadow;
mod text;


pub use redact::{redact_secrets, truncate_for_log};
pub use text::clean_input_text;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use tracing::debug;

use crate::constants::{AUDIT_LOG_TRUNCATE_LEN, DEFAULT_REGEX_TIMEOUT, DEFAULT_SANITIZER_MAX_LEN};
use guard::{Budget, BudgetExceeded, contains_dangerous};
use normalize::normalize;

/// Kinds of stylesheet value the sanitizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Color,
    Length,
    FontFamily,
    Shadow,
    Time,
    Generic,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Color,
        ValueKind::Length,
        ValueKind::FontFamily,
        ValueKind::Shadow,
        ValueKind::Time,
        ValueKind::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Color => "color",
            ValueKind::Length => "length",
            ValueKind::FontFamily => "font",
            ValueKind::Shadow => "shadow",
            ValueKind::Time => "time",
            ValueKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized [`ValueKind`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value kind '{0}' (expected color, length, font, shadow, time or generic)")]
pub struct UnknownValueKind(pub String);

impl FromStr for ValueKind {
    type Err = UnknownValueKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "font" | "font-family" => Ok(ValueKind::FontFamily),
            other => ValueKind::ALL
                .into_iter()
                .find(|kind| kind.as_str() == other)
                .ok_or_else(|| UnknownValueKind(s.to_string())),
        }
    }
}

/// Limits applied to every sanitizer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizerConfig {
    /// Longest accepted input, in chars. Default: `200`.
    pub max_len: usize,
    /// Wall-clock budget for the pattern-matching stages. Default: `100ms`.
    pub regex_timeout: Duration,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_SANITIZER_MAX_LEN,
            regex_timeout: DEFAULT_REGEX_TIMEOUT,
        }
    }
}

impl SanitizerConfig {
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_regex_timeout(mut self, timeout: Duration) -> Self {
        self.regex_timeout = timeout;
        self
    }
}

/// Why a value was turned away (logged, never returned).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Empty,
    TooLong,
    Undecodable,
    Dangerous,
    Grammar,
    Timeout,
}

impl Rejection {
    fn as_str(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty",
            Rejection::TooLong => "too_long",
            Rejection::Undecodable => "undecodable",
            Rejection::Dangerous => "dangerous_content",
            Rejection::Grammar => "grammar",
            Rejection::Timeout => "timeout",
        }
    }
}

impl From<BudgetExceeded> for Rejection {
    fn from(_: BudgetExceeded) -> Self {
        Rejection::Timeout
    }
}

/// Validates stylesheet values against per-kind allow-lists.
///
/// Stateless apart from its configuration, so one instance can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct CssSanitizer {
    config: SanitizerConfig,
}

impl CssSanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    /// Returns `value` unchanged when it is a valid `kind` value, `None` otherwise.
    pub fn sanitize(&self, kind: ValueKind, value: &str) -> Option<String> {
        match self.check(kind, value) {
            Ok(()) => Some(value.to_string()),
            Err(reason) => {
                debug!(
                    kind = %kind,
                    reason = reason.as_str(),
                    value = %truncate_for_log(value, AUDIT_LOG_TRUNCATE_LEN),
                    "Rejected stylesheet value"
                );
                None
            }
        }
    }

    pub fn color(&self, value: &str) -> Option<String> {
        self.sanitize(ValueKind::Color, value)
    }

    pub fn length(&self, value: &str) -> Option<String> {
        self.sanitize(ValueKind::Length, value)
    }

    pub fn font_family(&self, value: &str) -> Option<String> {
        self.sanitize(ValueKind::FontFamily, value)
    }

    pub fn shadow(&self, value: &str) -> Option<String> {
        self.sanitize(ValueKind::Shadow, value)
    }

    pub fn time(&self, value: &str) -> Option<String> {
        self.sanitize(ValueKind::Time, value)
    }

    pub fn generic(&self, value: &str) -> Option<String> {
        self.sanitize(ValueKind::Generic, value)
    }

    fn check(&self, kind: ValueKind, value: &str) -> Result<(), Rejection> {
        // Bounded count: never walks more than `max_len + 1` chars.
        if value.chars().take(self.config.max_len + 1).count() > self.config.max_len {
            return Err(Rejection::TooLong);
        }

        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Rejection::Empty);
        }

        let budget = Budget::start(self.config.regex_timeout);

        let normalized = normalize(trimmed).ok_or(Rejection::Undecodable)?;
        if contains_dangerous(trimmed) || contains_dangerous(&normalized) {
            return Err(Rejection::Dangerous);
        }
        budget.check()?;

        let valid = match kind {
            ValueKind::Color => color::is_color(trimmed, &budget)?,
            ValueKind::Length => length::is_length(trimmed, &budget)?,
            ValueKind::FontFamily => font::is_font_family(trimmed, &budget)?,
            ValueKind::Shadow => shadow::is_shadow(trimmed, &budget)?,
            ValueKind::Time => length::is_time(trimmed, &budget)?,
            ValueKind::Generic => length::is_generic(trimmed, &budget)?,
        };
        if !valid {
            return Err(Rejection::Grammar);
        }
        Ok(())
    }
}

static DEFAULT_SANITIZER: LazyLock<CssSanitizer> = LazyLock::new(CssSanitizer::default);

/// The shared default-configured sanitizer behind the free functions.
pub fn default_sanitizer() -> &'static CssSanitizer {
    &DEFAULT_SANITIZER
}

/// Validates a color (`#hex`, `rgb[a]()`, `hsl[a]()`, named). `None` in, `None` out.
pub fn sanitize_color(value: Option<&str>) -> Option<String> {
    value.and_then(|v| DEFAULT_SANITIZER.color(v))
}

/// Validates one or more lengths (`12px 1em 0`).
pub fn sanitize_length(value: Option<&str>) -> Option<String> {
    value.and_then(|v| DEFAULT_SANITIZER.length(v))
}

pub fn sanitize_font_family(value: Option<&str>) -> Option<String> {
    value.and_then(|v| DEFAULT_SANITIZER.font_family(v))
}

pub fn sanitize_shadow(value: Option<&str>) -> Option<String> {
    value.and_then(|v| DEFAULT_SANITIZER.shadow(v))
}

pub fn sanitize_time(value: Option<&str>) -> Option<String> {
    value.and_then(|v| DEFAULT_SANITIZER.time(v))
}

pub fn sanitize_generic(value: Option<&str>) -> Option<String> {
    value.and_then(|v| DEFAULT_SANITIZER.generic(v))
}
