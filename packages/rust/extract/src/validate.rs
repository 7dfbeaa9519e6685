//! Pluggable content validators.
//!
//! A validator inspects something extracted from a page and either accepts it
//! or rejects it with a reason. The analyzer decides what a rejection means.

use sitesignal_shared::ValidatorConfig;

/// Outcome of a validator check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub accepted: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// A single check over a string input.
pub trait ContentValidator: Send + Sync {
    /// Human-readable validator name for tracing.
    fn name(&self) -> &str;

    fn check(&self, input: &str) -> Verdict;
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

const PLACEHOLDER_MARKERS: [&str; 5] = [
    "lorem ipsum",
    "coming soon",
    "under construction",
    "domain is for sale",
    "parked free",
];

/// Rejects page text that looks like a placeholder or parked domain.
pub struct PlaceholderContentValidator {
    min_chars: usize,
}

impl PlaceholderContentValidator {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }
}

impl ContentValidator for PlaceholderContentValidator {
    fn name(&self) -> &str {
        "placeholder-content"
    }

    fn check(&self, text: &str) -> Verdict {
        let lower = text.to_lowercase();
        if let Some(marker) = PLACEHOLDER_MARKERS.iter().find(|m| lower.contains(*m)) {
            return Verdict::reject(format!("placeholder marker '{marker}'"));
        }

        let len = text.chars().count();
        if len < self.min_chars {
            return Verdict::reject(format!(
                "only {len} characters of text (minimum {})",
                self.min_chars
            ));
        }

        Verdict::accept()
    }
}

const GENERIC_NAMES: [&str; 9] = [
    "home",
    "homepage",
    "welcome",
    "index",
    "untitled",
    "unknown company",
    "login",
    "sign in",
    "default page",
];

/// Rejects company names that are really page names.
pub struct GenericCompanyNameValidator;

impl ContentValidator for GenericCompanyNameValidator {
    fn name(&self) -> &str {
        "generic-company-name"
    }

    fn check(&self, name: &str) -> Verdict {
        let normalized = name.trim().to_lowercase();
        if normalized.chars().count() < 2 {
            return Verdict::reject("name too short");
        }
        if GENERIC_NAMES.contains(&normalized.as_str()) {
            return Verdict::reject(format!("generic page name '{}'", name.trim()));
        }
        Verdict::accept()
    }
}

// ---------------------------------------------------------------------------
// ValidatorSet
// ---------------------------------------------------------------------------

/// The validators enabled for a run.
#[derive(Default)]
pub struct ValidatorSet {
    pub content: Option<Box<dyn ContentValidator>>,
    pub company_name: Option<Box<dyn ContentValidator>>,
}

impl ValidatorSet {
    /// No validators.
    pub fn none() -> Self {
        Self::default()
    }

    /// Check page text. Accepts when no content validator is enabled.
    pub fn check_content(&self, text: &str) -> Verdict {
        self.content
            .as_ref()
            .map_or_else(Verdict::accept, |v| v.check(text))
    }

    /// Check a company name. Accepts when no name validator is enabled.
    pub fn check_company_name(&self, name: &str) -> Verdict {
        self.company_name
            .as_ref()
            .map_or_else(Verdict::accept, |v| v.check(name))
    }
}

impl From<&ValidatorConfig> for ValidatorSet {
    fn from(config: &ValidatorConfig) -> Self {
        Self {
            content: config.placeholder_content.then(|| {
                Box::new(PlaceholderContentValidator::new(config.min_text_chars))
                    as Box<dyn ContentValidator>
            }),
            company_name: config
                .generic_company_name
                .then(|| Box::new(GenericCompanyNameValidator) as Box<dyn ContentValidator>),
        }
    }
}
