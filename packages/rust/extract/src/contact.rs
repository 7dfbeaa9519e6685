//! Email, phone, and street-address scraping.

use std::sync::LazyLock;

use regex::Regex;
use sitesignal_shared::ContactInfo;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").expect("valid email regex")
});

/// Deliberately permissive: optional country code, optional parentheses,
/// space/dot/dash separators.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}")
        .expect("valid phone regex")
});

/// House number, up to five name words, road-type suffix.
static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d{1,5}(?:\s+[A-Za-z0-9.'-]+){1,5}?\s+(?:Street|Avenue|Road|Boulevard|Drive|Lane|Way|Court|Place|Parkway|St|Ave|Rd|Blvd|Dr|Ln|Ct|Pl|Pkwy)\b",
    )
    .expect("valid address regex")
});

pub(crate) fn contact_of_text(text: &str) -> ContactInfo {
    ContactInfo {
        emails: first_unique(&EMAIL, text, ContactInfo::MAX_EMAILS),
        phones: first_unique(&PHONE, text, ContactInfo::MAX_PHONES),
        addresses: first_unique(&ADDRESS, text, ContactInfo::MAX_ADDRESSES),
    }
}

/// Distinct matches in first-seen order, at most `cap`.
fn first_unique(re: &Regex, text: &str, cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(cap);
    for m in re.find_iter(text) {
        if out.len() == cap {
            break;
        }
        let found = m.as_str().trim();
        if !out.iter().any(|seen| seen == found) {
            out.push(found.to_string());
        }
    }
    out
}
