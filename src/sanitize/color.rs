//! Color grammar: hex, `rgb[a]()`, `hsl[a]()` and named colors.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::guard::{Budget, Checked};

const NUM: &str = r"[+-]?(?:\d+(?:\.\d+)?|\.\d+)";

static HEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("hex color pattern compiles")
});

static RGB: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?i)^rgba?\(\s*({NUM})(%?)\s*,\s*({NUM})(%?)\s*,\s*({NUM})(%?)\s*(?:,\s*({NUM})(%?)\s*)?\)$"
    );
    Regex::new(&pattern).expect("rgb pattern compiles")
});

static HSL: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?i)^hsla?\(\s*({NUM})(?:deg)?\s*,\s*({NUM})%\s*,\s*({NUM})%\s*(?:,\s*({NUM})(%?)\s*)?\)$"
    );
    Regex::new(&pattern).expect("hsl pattern compiles")
});

/// CSS keywords accepted wherever a color is.
const COLOR_KEYWORDS: &[&str] = &["transparent", "currentcolor", "inherit", "initial", "unset"];

/// CSS named colors.
const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke",
    "yellow", "yellowgreen",
];

/// Validates a complete color value, including numeric ranges.
pub(crate) fn is_color(value: &str, budget: &Budget) -> Checked<bool> {
    let value = value.trim();
    if value.starts_with('#') {
        return budget.is_match(&HEX, value);
    }

    if is_named(value) {
        return Ok(true);
    }

    if let Some(caps) = budget.captures(&RGB, value)? {
        return Ok(rgb_in_range(&caps));
    }
    if let Some(caps) = budget.captures(&HSL, value)? {
        return Ok(hsl_in_range(&caps));
    }

    Ok(false)
}

/// Returns `true` when `token` opens a functional color (`rgb(`, `hsla(`, ...).
pub(crate) fn starts_functional(token: &str) -> bool {
    let lowered = token.to_ascii_lowercase();
    ["rgb(", "rgba(", "hsl(", "hsla("]
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

fn is_named(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    COLOR_KEYWORDS.contains(&lowered.as_str()) || NAMED_COLORS.contains(&lowered.as_str())
}

fn number(caps: &Captures<'_>, index: usize) -> Option<f64> {
    caps.get(index).and_then(|m| m.as_str().parse::<f64>().ok())
}

fn is_percent(caps: &Captures<'_>, index: usize) -> bool {
    caps.get(index).is_some_and(|m| m.as_str() == "%")
}

fn alpha_in_range(caps: &Captures<'_>, value: usize, percent: usize) -> bool {
    match number(caps, value) {
        None => caps.get(value).is_none(),
        Some(alpha) if is_percent(caps, percent) => (0.0..=100.0).contains(&alpha),
        Some(alpha) => (0.0..=1.0).contains(&alpha),
    }
}

fn rgb_in_range(caps: &Captures<'_>) -> bool {
    let channels_ok = [(1, 2), (3, 4), (5, 6)].iter().all(|&(value, percent)| {
        let max = if is_percent(caps, percent) { 100.0 } else { 255.0 };
        number(caps, value).is_some_and(|n| (0.0..=max).contains(&n))
    });
    channels_ok && alpha_in_range(caps, 7, 8)
}

fn hsl_in_range(caps: &Captures<'_>) -> bool {
    let hue_ok = number(caps, 1).is_some_and(|h| (0.0..=360.0).contains(&h));
    let sl_ok = [2, 3]
        .iter()
        .all(|&i| number(caps, i).is_some_and(|n| (0.0..=100.0).contains(&n)));
    hue_ok && sl_ok && alpha_in_range(caps, 4, 5)
}
