//! Keyword-presence privacy signals.

use sitesignal_shared::{SignalBucket, SignalCategory, Signals};

const DATA_COLLECTION: &[&str] = &[
    "collect",
    "gather",
    "obtain",
    "personal information",
    "personal data",
    "cookies",
    "tracking",
    "analytics",
];

const DATA_SHARING: &[&str] = &["share", "third part", "disclose", "sell", "transfer"];

const USER_RIGHTS: &[&str] = &[
    "access",
    "delete",
    "deletion",
    "opt-out",
    "opt out",
    "rectif",
    "portability",
    "right to",
];

const SECURITY_MEASURES: &[&str] = &[
    "encrypt",
    "security",
    "secure",
    "protect",
    "safeguard",
    "ssl",
    "tls",
];

const COMPLIANCE: &[&str] = &[
    "gdpr",
    "ccpa",
    "hipaa",
    "coppa",
    "pipeda",
    "compliance",
    "soc 2",
    "iso 27001",
];

/// Keyword list for a category. Matched as lower-case substrings.
pub fn keywords(category: SignalCategory) -> &'static [&'static str] {
    match category {
        SignalCategory::DataCollection => DATA_COLLECTION,
        SignalCategory::DataSharing => DATA_SHARING,
        SignalCategory::UserRights => USER_RIGHTS,
        SignalCategory::SecurityMeasures => SECURITY_MEASURES,
        SignalCategory::Compliance => COMPLIANCE,
    }
}

/// One evidence entry per keyword present in `text`, regardless of frequency.
pub(crate) fn signals_of_text(text: &str) -> Signals {
    let lower = text.to_lowercase();

    let buckets = SignalCategory::ALL
        .into_iter()
        .map(|category| {
            let evidence = keywords(category)
                .iter()
                .filter(|kw| lower.contains(*kw))
                .map(|kw| format!("{} mentioned with '{kw}'", category.label()))
                .collect();
            (category, SignalBucket { category, evidence })
        })
        .collect();

    Signals(buckets)
}
