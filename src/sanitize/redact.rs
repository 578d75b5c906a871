//! Secret redaction and log truncation for untrusted provider text.

use std::sync::LazyLock;

use regex::Regex;

const REDACTED: &str = "[REDACTED]";

static SK_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sk-[A-Za-z0-9_\-]{8,}").expect("sk key pattern compiles")
});

static BEARER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(bearer)\s+[A-Za-z0-9._~+/\-]+=*").expect("bearer pattern compiles")
});

static KEY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(["']?\b(?:api[_-]?key|access[_-]?token|refresh[_-]?token|client[_-]?secret|secret|password|token|key)["']?\s*[=:]\s*)["']?[^\s"'&,}]+["']?"#,
    )
    .expect("key field pattern compiles")
});

static OPAQUE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9+/_\-]{32,}={0,2}").expect("opaque token pattern compiles")
});

/// Replaces API-key-shaped substrings in `message` with `[REDACTED]`.
///
/// Covers `sk-...` keys, `Bearer` credentials, `api_key=...` / `"key": "..."` style
/// fields and long opaque tokens.
pub fn redact_secrets(message: &str) -> String {
    let redacted = SK_KEY.replace_all(message, REDACTED);
    let redacted = BEARER.replace_all(&redacted, format!("${{1}} {}", REDACTED).as_str());
    let redacted = KEY_FIELD.replace_all(&redacted, format!("${{1}}{}", REDACTED).as_str());
    OPAQUE_TOKEN.replace_all(&redacted, REDACTED).into_owned()
}

/// Truncates `value` to `max_chars` characters for logging, noting how much was cut.
pub fn truncate_for_log(value: &str, max_chars: usize) -> String {
    let total = value.chars().count();
    if total <= max_chars {
        return value.to_string();
    }
    let head: String = value.chars().take(max_chars).collect();
    format!("{}...[truncated {} chars]", head, total - max_chars)
}
