//! Injection screening and the per-call matching budget.

use std::time::{Duration, Instant};

use regex::{Captures, Regex};

/// Substrings that never appear in an accepted value (compared lowercase).
///
/// `--` blocks custom-property injection; the encoded spellings catch it before decoding.
pub(crate) const DANGEROUS_SUBSTRINGS: &[&str] = &[
    "url(",
    "expression(",
    "javascript:",
    "@import",
    "binding:",
    "<",
    ">",
    "{",
    "}",
    ";",
    "\\",
    "/*",
    "*/",
    "--",
    "%2d%2d",
    "&#45;&#45;",
    "&#x2d;&#x2d;",
    "&dash;&dash;",
    "&hyphen;&hyphen;",
];

/// Returns `true` when `value` contains any [`DANGEROUS_SUBSTRINGS`] entry, ignoring case.
pub(crate) fn contains_dangerous(value: &str) -> bool {
    let lowered = value.to_lowercase();
    DANGEROUS_SUBSTRINGS
        .iter()
        .any(|needle| lowered.contains(needle))
}

/// The matching budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BudgetExceeded;

pub(crate) type Checked<T> = Result<T, BudgetExceeded>;

/// Wall-clock budget shared by every pattern match of one sanitizer call.
///
/// Checked before and after each match, so a call never runs more than one match past
/// its deadline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Budget {
    started: Instant,
    limit: Duration,
}

impl Budget {
    pub(crate) fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Fails once the elapsed time reaches the limit.
    #[inline]
    pub(crate) fn check(&self) -> Checked<()> {
        if self.started.elapsed() >= self.limit {
            return Err(BudgetExceeded);
        }
        Ok(())
    }

    pub(crate) fn is_match(&self, pattern: &Regex, haystack: &str) -> Checked<bool> {
        self.check()?;
        let matched = pattern.is_match(haystack);
        self.check()?;
        Ok(matched)
    }

    pub(crate) fn captures<'h>(
        &self,
        pattern: &Regex,
        haystack: &'h str,
    ) -> Checked<Option<Captures<'h>>> {
        self.check()?;
        let caps = pattern.captures(haystack);
        self.check()?;
        Ok(caps)
    }
}
