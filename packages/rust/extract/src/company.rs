//! Company name heuristics.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use sitesignal_shared::UNKNOWN_COMPANY;

use crate::text::collapse_whitespace;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static H1: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("valid h1 selector"));
static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("valid og:title selector")
});

/// Separators between a company name and a page tagline.
const TITLE_SEPARATORS: [&str; 4] = [" - ", " | ", " — ", " – "];

pub(crate) fn company_name_of(doc: &Html) -> String {
    let from_title = doc
        .select(&TITLE)
        .next()
        .map(|el| strip_tagline(&el.text().collect::<String>()));

    let from_h1 = || {
        doc.select(&H1)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
    };

    let from_og = || {
        doc.select(&OG_TITLE)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(strip_tagline)
    };

    from_title
        .filter(|s| !s.is_empty())
        .or_else(|| from_h1().filter(|s| !s.is_empty()))
        .or_else(|| from_og().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
}

/// `"Acme | Analytics for teams"` → `"Acme"`. Cuts at the earliest separator.
fn strip_tagline(raw: &str) -> String {
    let title = collapse_whitespace(raw);
    let cut = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| title.find(sep))
        .min()
        .unwrap_or(title.len());
    title[..cut].trim().to_string()
}
