//! Legal-link discovery.
//!
//! Given a page's markup, find the links to its privacy policy, trust (security /
//! compliance) center, and terms of service. Footer regions are searched first,
//! then the whole document; a missing privacy link is guessed from conventional
//! paths. Pure and deterministic: no requests are made.

mod patterns;

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use sitesignal_shared::LinkSet;
use tracing::{debug, instrument};
use url::Url;

use patterns::{LinkKind, PRIVACY_FALLBACK_PATHS};

static FOOTER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"footer, [class*="footer" i], [id*="footer" i]"#).expect("valid footer selector")
});

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

// ---------------------------------------------------------------------------
// Origins
// ---------------------------------------------------------------------------

/// Which pass filled a `LinkSet` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOrigin {
    /// An anchor inside a footer region.
    Footer,
    /// An anchor elsewhere in the document.
    Document,
    /// Guessed from a conventional path.
    Fallback,
}

/// Per-field origins for a classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOrigins {
    pub privacy_policy: Option<LinkOrigin>,
    pub trust_center: Option<LinkOrigin>,
    pub terms_of_service: Option<LinkOrigin>,
}

/// A [`LinkSet`] together with where each link came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub links: LinkSet,
    pub origins: LinkOrigins,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Classify the anchors of `markup` into privacy / trust / terms links.
pub fn classify(markup: &str, base_url: &Url) -> LinkSet {
    classify_with_origins(markup, base_url).links
}

/// Like [`classify`], also reporting which pass filled each field.
#[instrument(skip_all, fields(base = %base_url))]
pub fn classify_with_origins(markup: &str, base_url: &Url) -> Classification {
    let doc = Html::parse_document(markup);
    let mut slots = Slots::default();

    for region in footer_regions(&doc) {
        // A region can itself be the anchor, e.g. `<a class="footer-link">`.
        let anchors = std::iter::once(region)
            .filter(|r| ANCHOR.matches(r))
            .chain(region.select(&ANCHOR));
        scan(anchors, base_url, LinkOrigin::Footer, &mut slots);
    }

    if !slots.is_full() {
        scan(doc.select(&ANCHOR), base_url, LinkOrigin::Document, &mut slots);
    }

    if slots.privacy.is_none() {
        slots.privacy = PRIVACY_FALLBACK_PATHS
            .iter()
            .find_map(|path| resolve(path, base_url))
            .map(|url| (url, LinkOrigin::Fallback));
    }

    let classification = slots.into_classification();
    debug!(
        privacy = ?classification.origins.privacy_policy,
        trust = ?classification.origins.trust_center,
        terms = ?classification.origins.terms_of_service,
        "links classified"
    );
    classification
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Slots {
    privacy: Option<(Url, LinkOrigin)>,
    trust: Option<(Url, LinkOrigin)>,
    terms: Option<(Url, LinkOrigin)>,
}

impl Slots {
    fn slot(&mut self, kind: LinkKind) -> &mut Option<(Url, LinkOrigin)> {
        match kind {
            LinkKind::Privacy => &mut self.privacy,
            LinkKind::Trust => &mut self.trust,
            LinkKind::Terms => &mut self.terms,
        }
    }

    fn is_full(&self) -> bool {
        self.privacy.is_some() && self.trust.is_some() && self.terms.is_some()
    }

    fn into_classification(self) -> Classification {
        let privacy_policy_guessed =
            matches!(self.privacy, Some((_, LinkOrigin::Fallback)));

        let (privacy_url, privacy_origin) = split(self.privacy);
        let (trust_url, trust_origin) = split(self.trust);
        let (terms_url, terms_origin) = split(self.terms);

        Classification {
            links: LinkSet {
                privacy_policy: privacy_url,
                trust_center: trust_url,
                terms_of_service: terms_url,
                privacy_policy_guessed,
            },
            origins: LinkOrigins {
                privacy_policy: privacy_origin,
                trust_center: trust_origin,
                terms_of_service: terms_origin,
            },
        }
    }
}

fn split(slot: Option<(Url, LinkOrigin)>) -> (Option<Url>, Option<LinkOrigin>) {
    match slot {
        Some((url, origin)) => (Some(url), Some(origin)),
        None => (None, None),
    }
}

/// Footer regions in document order, excluding any nested inside another region.
fn footer_regions(doc: &Html) -> Vec<ElementRef<'_>> {
    let regions: Vec<ElementRef<'_>> = doc.select(&FOOTER).collect();
    let ids: HashSet<_> = regions.iter().map(|r| r.id()).collect();

    regions
        .into_iter()
        .filter(|r| !r.ancestors().any(|a| ids.contains(&a.id())))
        .collect()
}

/// Offer each anchor to every still-empty category. First match wins.
fn scan<'a>(
    anchors: impl Iterator<Item = ElementRef<'a>>,
    base_url: &Url,
    origin: LinkOrigin,
    slots: &mut Slots,
) {
    for anchor in anchors {
        if slots.is_full() {
            break;
        }

        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve(href, base_url) else {
            continue;
        };
        let text: String = anchor.text().collect();

        for kind in LinkKind::ALL {
            let slot = slots.slot(kind);
            if slot.is_none() && kind.matches(href, &text) {
                *slot = Some((url.clone(), origin));
            }
        }
    }
}

/// Resolve an href to an absolute http(s) URL without fragment.
fn resolve(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();

    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
    {
        return None;
    }

    let mut url = base_url.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
