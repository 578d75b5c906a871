//! Font-family lists.

use std::sync::LazyLock;

use regex::Regex;

use super::guard::{Budget, Checked};

static FAMILY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]*$").expect("font family pattern compiles")
});

const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-serif",
    "ui-sans-serif",
    "ui-monospace",
    "ui-rounded",
    "emoji",
    "math",
    "fangsong",
];

/// Comma-separated families, each generic or a plain (optionally quoted) name.
pub(crate) fn is_font_family(value: &str, budget: &Budget) -> Checked<bool> {
    for entry in value.split(',') {
        if !is_family(entry.trim(), budget)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_family(entry: &str, budget: &Budget) -> Checked<bool> {
    if entry.is_empty() {
        return Ok(false);
    }
    if GENERIC_FAMILIES
        .iter()
        .any(|family| family.eq_ignore_ascii_case(entry))
    {
        return Ok(true);
    }

    let name = match unquote(entry) {
        Some(inner) => inner.trim(),
        None if entry.contains(['"', '\'']) => return Ok(false),
        None => entry,
    };
    if name.is_empty() {
        return Ok(false);
    }
    budget.is_match(&FAMILY_NAME, name)
}

fn unquote(entry: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|quote| {
        entry
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
            .filter(|inner| !inner.contains(quote))
    })
}
