//! Visible-text extraction.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

/// Elements whose text never reaches the reader.
const INVISIBLE: [&str; 4] = ["script", "style", "noscript", "template"];

/// Body text of a parsed document, whitespace-collapsed.
pub(crate) fn document_text(doc: &Html) -> String {
    let root = doc
        .select(&BODY)
        .next()
        .unwrap_or_else(|| doc.root_element());
    element_text(root)
}

/// Visible text under `root`, whitespace-collapsed, one space between text nodes.
pub(crate) fn element_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| INVISIBLE.contains(&e.name()))
        });
        if hidden {
            continue;
        }

        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }

    out
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_scripts_and_styles() {
        let doc = Html::parse_document(
            "<html><head><style>p{}</style></head><body>\
             <p>Hello</p><script>var x = 1;</script>\
             <noscript>Enable JS</noscript><p>world</p></body></html>",
        );
        assert_eq!(document_text(&doc), "Hello world");
    }

    #[test]
    fn separates_adjacent_blocks() {
        let doc = Html::parse_document("<body><div>one</div><div>two</div></body>");
        assert_eq!(document_text(&doc), "one two");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }
}
