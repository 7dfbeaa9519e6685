//! Pattern sets for recognising legal and trust links.

use std::sync::LazyLock;

use regex::Regex;

/// Which field of a `LinkSet` a pattern set fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkKind {
    Privacy,
    Trust,
    Terms,
}

impl LinkKind {
    pub(crate) const ALL: [LinkKind; 3] = [LinkKind::Privacy, LinkKind::Trust, LinkKind::Terms];

    fn pattern(self) -> &'static Regex {
        match self {
            LinkKind::Privacy => &PRIVACY,
            LinkKind::Trust => &TRUST,
            LinkKind::Terms => &TERMS,
        }
    }

    /// Does an anchor with this href and visible text belong to this kind?
    pub(crate) fn matches(self, href: &str, text: &str) -> bool {
        let re = self.pattern();
        re.is_match(href) || re.is_match(text)
    }
}

static PRIVACY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)privacy|data[-_\s]?protection|datenschutz").expect("valid privacy regex")
});

static TRUST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)trust|security|compliance").expect("valid trust regex"));

static TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)terms|\btos\b|conditions|legal|user[-_\s]?agreement")
        .expect("valid terms regex")
});

/// Conventional privacy-policy paths, tried in order when no anchor matched.
pub(crate) const PRIVACY_FALLBACK_PATHS: [&str; 5] = [
    "/privacy",
    "/privacy-policy",
    "/privacy-statement",
    "/legal/privacy",
    "/terms/privacy",
];
