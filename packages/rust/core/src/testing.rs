//! Shared helpers for analyzer and batch tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sitesignal_fetch::{DirectTransport, Fetcher};
use sitesignal_shared::{ContentType, FetchOptions, Result, ScoredSummary, SiteSignalError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::analyzer::AnalyzeOptions;

pub(crate) fn load_fixture(name: &str) -> String {
    let path = format!("../../../fixtures/html/{name}");
    std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
}

/// Direct-only fetcher that may talk to the local mock server and never waits between retries.
pub(crate) fn local_fetcher() -> Fetcher {
    Fetcher::new(Arc::new(DirectTransport::with_private_hosts(true).unwrap()))
        .allow_private_hosts(true)
        .with_backoff_unit(Duration::ZERO)
}

pub(crate) fn options(use_ai: bool) -> AnalyzeOptions {
    AnalyzeOptions {
        fetch: FetchOptions {
            timeout: Duration::from_secs(5),
            max_retries: 3,
            prefer_rendering: false,
            user_agent: "SiteSignalTest/1.0".into(),
        },
        use_ai,
    }
}

pub(crate) async fn serve(server: &MockServer, route: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
        .mount(server)
        .await;
}

/// Summarizer that hands out a fixed sequence of privacy scores.
pub(crate) struct StubSummarizer {
    scores: Mutex<VecDeque<u8>>,
    fail_for: Option<ContentType>,
    seen: Mutex<Vec<ContentType>>,
    calls: AtomicUsize,
}

impl StubSummarizer {
    pub(crate) fn with_scores(scores: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            scores: Mutex::new(scores.iter().copied().collect()),
            fail_for: None,
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Fails whenever asked to summarize `content_type`.
    pub(crate) fn failing_for(content_type: ContentType, scores: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            scores: Mutex::new(scores.iter().copied().collect()),
            fail_for: Some(content_type),
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<ContentType> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl crate::summarizer::Summarizer for StubSummarizer {
    async fn summarize(&self, _content: &str, content_type: ContentType) -> Result<ScoredSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(content_type);

        if self.fail_for == Some(content_type) {
            return Err(SiteSignalError::Summarizer("stub unavailable".into()));
        }

        let score = self
            .scores
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScoredSummary::NEUTRAL_SCORE);

        Ok(ScoredSummary {
            summary: format!("stub summary of {}", content_type.as_str()),
            key_findings: vec![],
            privacy_score: score,
            security_score: score,
            compliance_score: score,
            recommendations: vec![],
            risks: vec![],
            data_usage_summary: String::new(),
            user_rights_summary: String::new(),
            source: content_type,
        })
    }
}
