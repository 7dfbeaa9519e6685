//! About-the-company information.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use sitesignal_shared::AboutInfo;

use crate::text::{collapse_whitespace, element_text};

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static H1: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("valid h1 selector"));
static META_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"]"#).expect("valid description selector")
});
static OG_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:description"]"#).expect("valid og:description selector")
});
static BLOCKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div, section, article, p, aside, main, header").expect("valid block selector")
});

const ABOUT_MARKERS: [&str; 4] = ["about", "company", "mission", "vision"];

/// Minimum text length for an about-block to count as a description.
const MIN_BLOCK_CHARS: usize = 50;

/// Descriptions longer than this are truncated.
const MAX_DESCRIPTION_CHARS: usize = 1000;

pub(crate) fn about_of(doc: &Html) -> AboutInfo {
    AboutInfo {
        title: first_text(doc, &TITLE),
        main_heading: first_text(doc, &H1),
        description: meta_content(doc, &META_DESCRIPTION)
            .or_else(|| meta_content(doc, &OG_DESCRIPTION))
            .or_else(|| about_block(doc))
            .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS)),
    }
}

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn meta_content(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .find_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

/// First block whose class or id names it as about/company/mission/vision content.
fn about_block(doc: &Html) -> Option<String> {
    doc.select(&BLOCKS)
        .filter(|el| {
            let value = el.value();
            let names = format!(
                "{} {}",
                value.attr("class").unwrap_or_default(),
                value.id().unwrap_or_default()
            )
            .to_lowercase();
            ABOUT_MARKERS.iter().any(|m| names.contains(m))
        })
        .map(element_text)
        .find(|text| text.chars().count() >= MIN_BLOCK_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
