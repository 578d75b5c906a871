//! Undo the obfuscation tricks used to smuggle markers past a substring check.

use unicode_normalization::UnicodeNormalization;

/// Nested encodings (`%2526...`) are peeled at most this many times.
const MAX_DECODE_ROUNDS: usize = 4;

/// Normalizes `value` for screening: NFKC (fullwidth forms), Unicode dashes to `-`,
/// URL-decoding and HTML-entity decoding, repeated until the text stops changing.
///
/// Returns `None` when a percent-escape decodes to invalid UTF-8.
pub(crate) fn normalize(value: &str) -> Option<String> {
    let mut current = fold(value);

    for _ in 0..MAX_DECODE_ROUNDS {
        let url_decoded = urlencoding::decode(&current).ok()?;
        let entity_decoded = html_escape::decode_html_entities(&url_decoded);
        let next = fold(&entity_decoded);
        if next == current {
            break;
        }
        current = next;
    }

    Some(current)
}

fn fold(value: &str) -> String {
    value.nfkc().map(fold_dash).collect()
}

#[inline]
fn fold_dash(c: char) -> char {
    match c {
        '\u{2010}'..='\u{2015}'
        | '\u{2043}'
        | '\u{2212}'
        | '\u{2E3A}'
        | '\u{2E3B}'
        | '\u{FE58}'
        | '\u{FE63}'
        | '\u{FF0D}' => '-',
        other => other,
    }
}
