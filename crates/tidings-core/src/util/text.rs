//! Text cleanup helpers.

use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Remove markup tags and collapse whitespace.
///
/// Every tag is replaced by a single space so that adjacent block elements
/// (`<p>a</p><p>b</p>`) do not glue their words together; runs of whitespace
/// are then collapsed and the result trimmed.
pub fn strip_markup(html: &str) -> String {
    let without_tags = TAG.replace_all(html, " ");
    WHITESPACE
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}
