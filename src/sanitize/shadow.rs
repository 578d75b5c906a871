//! `box-shadow` / `text-shadow` values.

use super::color::{is_color, starts_functional};
use super::guard::{Budget, Checked};
use super::length::is_length_token;

/// Fewest components (lengths, colors, `inset`) in one shadow.
const MIN_COMPONENTS: usize = 3;

/// `none`, or comma-separated shadows of at least three lengths, colors or `inset` keywords.
pub(crate) fn is_shadow(value: &str, budget: &Budget) -> Checked<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Ok(true);
    }

    let Some(layers) = split_layers(value) else {
        return Ok(false);
    };
    for layer in layers {
        if !is_layer(layer, budget)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Splits on commas outside parentheses. `None` when parentheses do not balance.
fn split_layers(value: &str) -> Option<Vec<&str>> {
    let mut layers = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                layers.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    layers.push(&value[start..]);
    Some(layers)
}

fn is_layer(layer: &str, budget: &Budget) -> Checked<bool> {
    let tokens: Vec<&str> = layer.split_whitespace().collect();
    let mut components = 0;
    let mut i = 0;

    while i < tokens.len() {
        budget.check()?;
        let token = tokens[i];

        if token.eq_ignore_ascii_case("inset") {
            components += 1;
            i += 1;
            continue;
        }
        if is_length_token(token, budget)? {
            components += 1;
            i += 1;
            continue;
        }

        // A functional color may have been split on the spaces inside its parentheses.
        let end = if starts_functional(token) && !token.contains(')') {
            match tokens[i..].iter().position(|t| t.contains(')')) {
                Some(offset) => i + offset,
                None => return Ok(false),
            }
        } else {
            i
        };
        let candidate = tokens[i..=end].join(" ");
        if !is_color(&candidate, budget)? {
            return Ok(false);
        }
        components += 1;
        i = end + 1;
    }

    Ok(components >= MIN_COMPONENTS)
}
