//! Analysis orchestration for SiteSignal.
//!
//! Ties fetching, link discovery, and signal extraction into a per-site
//! [`SiteAnalyzer`], drives it over many sites with [`run_batch`], and defines
//! the [`Summarizer`] seam for optional AI assessment.

pub mod analyzer;
pub mod batch;
pub mod summarizer;

#[cfg(test)]
mod testing;

pub use analyzer::{AnalyzeOptions, SiteAnalyzer};
pub use batch::{BatchObserver, SilentObserver, run_batch};
pub use summarizer::{OpenRouterSummarizer, Summarizer};
