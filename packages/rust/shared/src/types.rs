//! Core domain types for SiteSignal analyses and batch runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Company name used when no title, heading, or Open-Graph title is found.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

// ---------------------------------------------------------------------------
// FetchResult
// ---------------------------------------------------------------------------

/// Why a fetch gave up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    /// The requested URL.
    pub url: String,
    /// Attempts made before giving up (0 if the URL was refused outright).
    pub attempts: u32,
    /// Last error observed.
    pub reason: String,
}

/// Outcome of a fetch. Failure is a value, never a panic or a raised error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Page markup.
    Content(String),
    /// Retries exhausted or URL refused.
    Failure(FetchFailure),
}

impl FetchResult {
    /// Markup if the fetch succeeded.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Content(markup) => Some(markup),
            Self::Failure(_) => None,
        }
    }

    /// Convert into a `Result` for `?`-style propagation.
    pub fn into_result(self) -> crate::Result<String> {
        match self {
            Self::Content(markup) => Ok(markup),
            Self::Failure(f) => Err(crate::SiteSignalError::Fetch {
                url: f.url,
                attempts: f.attempts,
                reason: f.reason,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// LinkSet
// ---------------------------------------------------------------------------

/// Legally relevant sub-pages discovered on a site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_policy: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_center: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<Url>,
    /// `privacy_policy` came from the conventional-path guess, not from an anchor.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privacy_policy_guessed: bool,
}

impl LinkSet {
    /// No category populated.
    pub fn is_empty(&self) -> bool {
        self.privacy_policy.is_none() && self.trust_center.is_none() && self.terms_of_service.is_none()
    }
}

// ---------------------------------------------------------------------------
// ContactInfo / AboutInfo
// ---------------------------------------------------------------------------

/// Contact details scraped from page text. Deduplicated, first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub addresses: Vec<String>,
}

impl ContactInfo {
    pub const MAX_EMAILS: usize = 5;
    pub const MAX_PHONES: usize = 5;
    pub const MAX_ADDRESSES: usize = 3;

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.addresses.is_empty()
    }
}

/// Descriptive information about the company behind a site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Privacy/security/compliance topic a keyword belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalCategory {
    DataCollection,
    DataSharing,
    UserRights,
    SecurityMeasures,
    Compliance,
}

impl SignalCategory {
    /// All categories in reporting order.
    pub const ALL: [SignalCategory; 5] = [
        Self::DataCollection,
        Self::DataSharing,
        Self::UserRights,
        Self::SecurityMeasures,
        Self::Compliance,
    ];

    /// Human-readable label used in evidence strings and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DataCollection => "Data collection",
            Self::DataSharing => "Data sharing",
            Self::UserRights => "User rights",
            Self::SecurityMeasures => "Security measures",
            Self::Compliance => "Compliance",
        }
    }
}

impl std::fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Evidence list for one category: one entry per matched keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalBucket {
    pub category: SignalCategory,
    pub evidence: Vec<String>,
}

impl SignalBucket {
    pub fn new(category: SignalCategory) -> Self {
        Self {
            category,
            evidence: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.evidence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty()
    }
}

/// Category → bucket map. Always holds all five categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signals(pub BTreeMap<SignalCategory, SignalBucket>);

impl Signals {
    /// Five empty buckets.
    pub fn empty() -> Self {
        Self(
            SignalCategory::ALL
                .iter()
                .map(|c| (*c, SignalBucket::new(*c)))
                .collect(),
        )
    }

    pub fn bucket(&self, category: SignalCategory) -> Option<&SignalBucket> {
        self.0.get(&category)
    }

    /// Number of evidence entries in `category` (0 if absent).
    pub fn count(&self, category: SignalCategory) -> usize {
        self.bucket(category).map_or(0, SignalBucket::len)
    }

    pub fn total(&self) -> usize {
        self.0.values().map(SignalBucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// ScoredSummary
// ---------------------------------------------------------------------------

/// Kind of content handed to the summarizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    PrivacyPolicy,
    TrustCenter,
    General,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivacyPolicy => "privacy_policy",
            Self::TrustCenter => "trust_center",
            Self::General => "general",
        }
    }
}

/// AI-generated assessment of a page's privacy/security/compliance posture.
///
/// Scores are always within 1–10; see `ScoredSummary::normalize_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSummary {
    pub summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    pub privacy_score: u8,
    pub security_score: u8,
    pub compliance_score: u8,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub data_usage_summary: String,
    #[serde(default)]
    pub user_rights_summary: String,
    /// Which page the summary was produced from.
    pub source: ContentType,
}

impl ScoredSummary {
    /// Score used when the model returns something outside 1–10 or non-numeric.
    pub const NEUTRAL_SCORE: u8 = 5;

    /// Coerce an untrusted JSON value into a 1–10 score.
    ///
    /// Integers and floats in range are accepted (floats rounded), as are
    /// numeric strings. Anything else maps to [`Self::NEUTRAL_SCORE`].
    pub fn normalize_score(value: Option<&serde_json::Value>) -> u8 {
        let n = match value {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match n {
            Some(n) if n.is_finite() && (1.0..=10.0).contains(&n) => n.round() as u8,
            _ => Self::NEUTRAL_SCORE,
        }
    }
}

// ---------------------------------------------------------------------------
// SiteAnalysis
// ---------------------------------------------------------------------------

/// Everything learned about one site. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAnalysis {
    pub company_name: String,
    pub main_url: Url,
    pub links: LinkSet,
    pub contact: ContactInfo,
    pub about: AboutInfo,
    pub signals: Signals,
    pub privacy_summary: String,
    pub trust_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<ScoredSummary>,
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for batch run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One processed URL in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    /// The URL as supplied by the caller.
    pub url: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<SiteAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn succeeded(url: impl Into<String>, analysis: SiteAnalysis) -> Self {
        Self {
            url: url.into(),
            success: true,
            analysis: Some(analysis),
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            analysis: None,
            error: Some(error.into()),
        }
    }
}

/// Summary statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAggregate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_privacy_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_security_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_compliance_score: Option<f64>,
    pub top_company_names: Vec<String>,
}

/// Result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub run_id: RunId,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchEntry>,
    pub aggregate: BatchAggregate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
