//! Length, time, number and keyword grammars.

use std::sync::LazyLock;

use regex::Regex;

use super::guard::{Budget, Checked};

static LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[+-]?(?:\d+(?:\.\d+)?|\.\d+)(?:px|em|rem|%|vh|vw|vmin|vmax|ch|ex|cm|mm|in|pt|pc)$")
        .expect("length pattern compiles")
});

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[+-]?(?:\d+(?:\.\d+)?|\.\d+)(?:ms|s)$").expect("time pattern compiles")
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d+)?|\.\d+)$").expect("number pattern compiles")
});

/// Keywords accepted by the generic grammar.
pub(crate) const GENERIC_KEYWORDS: &[&str] = &["normal", "inherit", "initial", "unset", "auto"];

/// One length token: number plus unit, or a bare `0`.
pub(crate) fn is_length_token(token: &str, budget: &Budget) -> Checked<bool> {
    if token == "0" {
        return Ok(true);
    }
    budget.is_match(&LENGTH, token)
}

/// One or more whitespace-separated length tokens.
pub(crate) fn is_length(value: &str, budget: &Budget) -> Checked<bool> {
    let mut tokens = value.split_whitespace().peekable();
    if tokens.peek().is_none() {
        return Ok(false);
    }
    for token in tokens {
        if !is_length_token(token, budget)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(crate) fn is_time(value: &str, budget: &Budget) -> Checked<bool> {
    budget.is_match(&TIME, value.trim())
}

pub(crate) fn is_generic(value: &str, budget: &Budget) -> Checked<bool> {
    let value = value.trim();
    if GENERIC_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(value))
    {
        return Ok(true);
    }
    if budget.is_match(&NUMBER, value)? {
        return Ok(true);
    }
    is_length(value, budget)
}
