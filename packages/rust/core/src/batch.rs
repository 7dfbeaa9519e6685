//! Sequential multi-site runs with per-site failure isolation.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};
use url::Url;

use sitesignal_shared::{BatchAggregate, BatchEntry, BatchResult, RunId, SiteAnalysis};

use crate::analyzer::{AnalyzeOptions, SiteAnalyzer};

/// Number of company names kept in the aggregate.
const TOP_COMPANY_NAMES: usize = 5;

/// Per-site callbacks for progress display and incremental output.
pub trait BatchObserver: Send + Sync {
    /// Called before site `index` (0-based) of `total` is analyzed.
    fn site_started(&self, _index: usize, _total: usize, _url: &str) {}

    /// Called after a site finishes, successfully or not.
    fn site_completed(&self, _index: usize, _total: usize, _entry: &BatchEntry) {}
}

/// Observer that ignores every event.
pub struct SilentObserver;

impl BatchObserver for SilentObserver {}

/// Analyze `urls` one after another, sleeping `delay` between sites.
///
/// Never fails as a whole: an unparsable URL or a failed analysis becomes a
/// failed entry and the run continues.
#[instrument(skip_all, fields(sites = urls.len()))]
pub async fn run_batch(
    analyzer: &SiteAnalyzer,
    urls: &[String],
    opts: &AnalyzeOptions,
    delay: Duration,
    observer: &dyn BatchObserver,
) -> BatchResult {
    let run_id = RunId::new();
    let started_at = Utc::now();
    let total = urls.len();

    info!(%run_id, total, "batch started");

    let mut results = Vec::with_capacity(total);

    for (index, raw) in urls.iter().enumerate() {
        observer.site_started(index, total, raw);

        let entry = match Url::parse(raw.trim()) {
            Ok(url) => match analyzer.analyze(&url, opts).await {
                Ok(analysis) => BatchEntry::succeeded(raw.as_str(), analysis),
                Err(e) => {
                    warn!(url = %raw, error = %e, "site failed");
                    BatchEntry::failed(raw.as_str(), e.to_string())
                }
            },
            Err(e) => {
                warn!(url = %raw, error = %e, "invalid URL");
                BatchEntry::failed(raw.as_str(), format!("invalid URL: {e}"))
            }
        };

        observer.site_completed(index, total, &entry);
        results.push(entry);

        if index + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let successful = results.iter().filter(|e| e.success).count();
    let aggregate = aggregate(&results);

    info!(
        %run_id,
        total,
        successful,
        failed = total - successful,
        "batch finished"
    );

    BatchResult {
        run_id,
        total,
        successful,
        failed: total - successful,
        results,
        aggregate,
        started_at,
        finished_at: Utc::now(),
    }
}

/// Averages over sites with an AI summary, plus the first successful company names.
pub fn aggregate(results: &[BatchEntry]) -> BatchAggregate {
    let analyses: Vec<&SiteAnalysis> = results.iter().filter_map(|e| e.analysis.as_ref()).collect();
    let scored: Vec<_> = analyses.iter().filter_map(|a| a.ai_summary.as_ref()).collect();

    let average = |score: fn(&sitesignal_shared::ScoredSummary) -> u8| -> Option<f64> {
        if scored.is_empty() {
            return None;
        }
        let sum: f64 = scored.iter().map(|s| f64::from(score(s))).sum();
        Some(round_one_decimal(sum / scored.len() as f64))
    };

    BatchAggregate {
        avg_privacy_score: average(|s| s.privacy_score),
        avg_security_score: average(|s| s.security_score),
        avg_compliance_score: average(|s| s.compliance_score),
        top_company_names: analyses
            .iter()
            .take(TOP_COMPANY_NAMES)
            .map(|a| a.company_name.clone())
            .collect(),
    }
}

fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
