//! Message extraction from HTML error pages

use regex::Regex;
use std::sync::LazyLock;

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

static HEADING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([12])[^>]*>(.*?)</h[12]>").unwrap());

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Human-readable message from an HTML page: `<title>`, then the first
/// `<h1>`/`<h2>` heading
pub fn extract_message(html: &str) -> Option<String> {
    let title = TITLE_REGEX
        .captures(html)
        .map(|c| clean(&c[1]))
        .filter(|s| !s.is_empty());

    title.or_else(|| {
        HEADING_REGEX
            .captures_iter(html)
            .map(|c| clean(&c[2]))
            .find(|s| !s.is_empty())
    })
}

fn clean(fragment: &str) -> String {
    let stripped = TAG_REGEX.replace_all(fragment, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
