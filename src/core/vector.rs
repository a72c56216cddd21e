use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Canvas used when a vector document declares no usable size.
pub const DEFAULT_VECTOR_DIM: u32 = 64;

/// Fill color used when no declared color parses: a neutral blue.
pub const FALLBACK_FILL: [u8; 3] = [100, 100, 200];

/// Upper bound on a declared dimension; larger values are treated as
/// malformed markup and clamped.
pub const MAX_DECLARED_DIM: u32 = 8192;

static WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"width=["']([^"']+)["']"#).unwrap());
static HEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"height=["']([^"']+)["']"#).unwrap());
static VIEWBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"viewBox=["']([^"']+)["']"#).unwrap());
static FILL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)fill[:=]["']([^"']+)["']"#).unwrap());
static STYLE_FILL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)style=["'][^"']*fill:([^;"']+)"#).unwrap());
static RGB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^rgb\((\d+),\s*(\d+),\s*(\d+)\)").unwrap());

/// Derive the canvas size for a vector document.
///
/// Parse strategies run in a fixed precedence order, first success wins:
/// explicit `width`/`height` attributes (both must be numeric after
/// stripping unit suffixes), then the third and fourth viewBox components,
/// then the default square canvas.
pub fn parse_dimensions(markup: &str) -> (u32, u32) {
    explicit_size(markup)
        .or_else(|| viewbox_size(markup))
        .unwrap_or((DEFAULT_VECTOR_DIM, DEFAULT_VECTOR_DIM))
}

fn explicit_size(markup: &str) -> Option<(u32, u32)> {
    let w = WIDTH_RE.captures(markup)?;
    let h = HEIGHT_RE.captures(markup)?;
    let w = numeric_part(&w[1])?;
    let h = numeric_part(&h[1])?;
    Some((clamp_dim(w), clamp_dim(h)))
}

fn viewbox_size(markup: &str) -> Option<(u32, u32)> {
    let vb = VIEWBOX_RE.captures(markup)?;
    let parts: Vec<&str> = vb[1].split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }
    let w = parts[2].parse::<f64>().ok()?;
    let h = parts[3].parse::<f64>().ok()?;
    Some((clamp_dim(w), clamp_dim(h)))
}

/// Parse a numeric attribute value, tolerating unit suffixes like `120px`.
fn numeric_part(value: &str) -> Option<f64> {
    let digits: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<f64>().ok()
}

fn clamp_dim(value: f64) -> u32 {
    let dim = value as u32;
    if dim > MAX_DECLARED_DIM {
        warn!(declared = dim, "clamping oversized vector dimension");
    }
    dim.clamp(1, MAX_DECLARED_DIM)
}

/// Extract a representative fill color from vector markup.
///
/// Scans `fill` attribute/property values in document order, then inline
/// `style="...fill:..."` declarations; the first value that parses as a
/// known color form wins. Falls back to [`FALLBACK_FILL`].
pub fn extract_fill(markup: &str) -> [u8; 3] {
    for caps in FILL_RE.captures_iter(markup) {
        if let Some(color) = parse_color(&caps[1]) {
            return color;
        }
    }
    for caps in STYLE_FILL_RE.captures_iter(markup) {
        if let Some(color) = parse_color(&caps[1]) {
            return color;
        }
    }
    FALLBACK_FILL
}

/// Parse a CSS-ish color literal: `rgb(r,g,b)`, 3- or 6-digit hex, or one
/// of a small named table. Anything else is rejected, not guessed.
pub fn parse_color(value: &str) -> Option<[u8; 3]> {
    let value = value.trim().to_lowercase();

    if let Some(caps) = RGB_RE.captures(&value) {
        let r = caps[1].parse::<u8>().ok()?;
        let g = caps[2].parse::<u8>().ok()?;
        let b = caps[3].parse::<u8>().ok()?;
        return Some([r, g, b]);
    }

    if let Some(hex) = value.strip_prefix('#') {
        let expanded: String = if hex.len() == 3 {
            hex.chars().flat_map(|c| [c, c]).collect()
        } else {
            hex.to_string()
        };
        if expanded.len() == 6 {
            let r = u8::from_str_radix(&expanded[0..2], 16).ok()?;
            let g = u8::from_str_radix(&expanded[2..4], 16).ok()?;
            let b = u8::from_str_radix(&expanded[4..6], 16).ok()?;
            return Some([r, g, b]);
        }
        return None;
    }

    match value.as_str() {
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 255, 0]),
        "blue" => Some([0, 0, 255]),
        "yellow" => Some([255, 255, 0]),
        "orange" => Some([255, 165, 0]),
        "purple" => Some([128, 0, 128]),
        "black" => Some([0, 0, 0]),
        "white" => Some([255, 255, 255]),
        "gray" | "grey" => Some([128, 128, 128]),
        _ => None,
    }
}
