//! Retry policy and per-attempt transport selection.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use url::Url;

use sitesignal_shared::{AppConfig, FetchFailure, FetchOptions, FetchResult, Result};

use crate::direct::DirectTransport;
use crate::guard::is_private_target;
use crate::render::{RenderEngine, RenderTransport};
use crate::transport::Transport;

/// Default backoff unit. Attempt `n` is followed by a wait of `n` units.
const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_millis(1000);

/// Fetches pages with bounded retries, preferring rendering when it is available.
pub struct Fetcher {
    direct: Arc<dyn Transport>,
    renderer: Option<Arc<dyn Transport>>,
    backoff_unit: Duration,
    allow_private_hosts: bool,
}

impl Fetcher {
    /// A fetcher with only the given direct transport.
    pub fn new(direct: Arc<dyn Transport>) -> Self {
        Self {
            direct,
            renderer: None,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            allow_private_hosts: false,
        }
    }

    /// Build the production fetcher: reqwest direct transport plus the shared render engine.
    pub fn from_config(config: &AppConfig, engine: Option<Arc<RenderEngine>>) -> Result<Self> {
        let allow = config.fetch.allow_private_hosts;
        let mut fetcher =
            Self::new(Arc::new(DirectTransport::with_private_hosts(allow)?)).allow_private_hosts(allow);

        if let Some(engine) = engine {
            fetcher = fetcher.with_renderer(Arc::new(RenderTransport::new(engine)));
        }

        Ok(fetcher)
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Transport>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Permit loopback and private-network targets.
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// Fetch `url`, retrying up to `opts.max_retries` attempts in total.
    ///
    /// The transport is chosen again before every attempt, so a renderer that
    /// drops out mid-run hands over to the direct transport. Never panics and
    /// never returns an error: exhaustion is reported as [`FetchResult::Failure`].
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &Url, opts: &FetchOptions) -> FetchResult {
        if let Some(reason) = self.refusal(url) {
            warn!(%reason, "refusing fetch");
            return FetchResult::Failure(FetchFailure {
                url: url.to_string(),
                attempts: 0,
                reason,
            });
        }

        let max_attempts = opts.max_retries.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            let transport = self.select(opts).await;
            debug!(attempt, max_attempts, transport = transport.name(), "fetch attempt");

            match transport.fetch(url, opts).await {
                Ok(markup) => {
                    info!(
                        attempt,
                        transport = transport.name(),
                        bytes = markup.len(),
                        "fetched"
                    );
                    return FetchResult::Content(markup);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        transport = transport.name(),
                        error = %e,
                        "fetch attempt failed"
                    );
                    last_reason = e.to_string();
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.backoff_unit * attempt).await;
            }
        }

        FetchResult::Failure(FetchFailure {
            url: url.to_string(),
            attempts: max_attempts,
            reason: last_reason,
        })
    }

    async fn select(&self, opts: &FetchOptions) -> &dyn Transport {
        if opts.prefer_rendering {
            if let Some(renderer) = &self.renderer {
                if renderer.is_available().await {
                    return renderer.as_ref();
                }
            }
        }
        self.direct.as_ref()
    }

    fn refusal(&self, url: &Url) -> Option<String> {
        if !matches!(url.scheme(), "http" | "https") {
            return Some(format!("unsupported scheme '{}'", url.scheme()));
        }
        if !self.allow_private_hosts && is_private_target(url) {
            return Some("target resolves to a private or local host".into());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use async_trait::async_trait;
    use sitesignal_shared::SiteSignalError;

    /// Transport that replays a fixed list of outcomes.
    struct Scripted {
        name: &'static str,
        available: AtomicBool,
        vanish_on_error: bool,
        outcomes: Mutex<VecDeque<std::result::Result<&'static str, &'static str>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(
            name: &'static str,
            outcomes: Vec<std::result::Result<&'static str, &'static str>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                available: AtomicBool::new(true),
                vanish_on_error: false,
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
            })
        }

        /// A renderer whose browser dies on its first failure.
        fn crashing(outcomes: Vec<std::result::Result<&'static str, &'static str>>) -> Arc<Self> {
            Arc::new(Self {
                name: "render",
                available: AtomicBool::new(true),
                vanish_on_error: true,
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        async fn fetch(&self, _url: &Url, _opts: &FetchOptions) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.outcomes.lock().unwrap().pop_front();
            match next {
                Some(Ok(body)) => Ok(body.to_string()),
                Some(Err(reason)) => {
                    if self.vanish_on_error {
                        self.available.store(false, Ordering::SeqCst);
                    }
                    Err(SiteSignalError::Network(reason.to_string()))
                }
                None => Err(SiteSignalError::Network("script exhausted".into())),
            }
        }
    }

    fn opts(max_retries: u32, prefer_rendering: bool) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(1),
            max_retries,
            prefer_rendering,
            user_agent: "test".into(),
        }
    }

    fn url() -> Url {
        Url::parse("https://acme.example/").unwrap()
    }

    fn fetcher(direct: Arc<Scripted>) -> Fetcher {
        Fetcher::new(direct).with_backoff_unit(Duration::ZERO)
    }

    #[tokio::test]
    async fn retries_until_success() {
        let direct = Scripted::new("direct", vec![Err("reset"), Err("reset"), Ok("<html/>")]);
        let result = fetcher(direct.clone()).fetch(&url(), &opts(3, false)).await;

        assert_eq!(result, FetchResult::Content("<html/>".into()));
        assert_eq!(direct.calls(), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_reason() {
        let direct = Scripted::new("direct", vec![Err("first"), Err("second")]);
        let result = fetcher(direct.clone()).fetch(&url(), &opts(2, false)).await;

        match result {
            FetchResult::Failure(f) => {
                assert_eq!(f.attempts, 2);
                assert!(f.reason.contains("second"));
                assert_eq!(f.url, "https://acme.example/");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(direct.calls(), 2);
    }

    #[tokio::test]
    async fn zero_retries_still_makes_one_attempt() {
        let direct = Scripted::new("direct", vec![Ok("body")]);
        let result = fetcher(direct.clone()).fetch(&url(), &opts(0, false)).await;

        assert!(result.content().is_some());
        assert_eq!(direct.calls(), 1);
    }

    #[tokio::test]
    async fn prefers_available_renderer() {
        let direct = Scripted::new("direct", vec![Ok("static")]);
        let renderer = Scripted::new("render", vec![Ok("rendered")]);
        let result = fetcher(direct.clone())
            .with_renderer(renderer.clone())
            .fetch(&url(), &opts(3, true))
            .await;

        assert_eq!(result.content(), Some("rendered"));
        assert_eq!(direct.calls(), 0);
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test]
    async fn ignores_renderer_when_not_preferred() {
        let direct = Scripted::new("direct", vec![Ok("static")]);
        let renderer = Scripted::new("render", vec![Ok("rendered")]);
        let result = fetcher(direct.clone())
            .with_renderer(renderer.clone())
            .fetch(&url(), &opts(3, false))
            .await;

        assert_eq!(result.content(), Some("static"));
        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_to_direct_after_renderer_crash() {
        let direct = Scripted::new("direct", vec![Ok("static")]);
        let renderer = Scripted::crashing(vec![Err("target closed")]);
        let result = fetcher(direct.clone())
            .with_renderer(renderer.clone())
            .fetch(&url(), &opts(3, true))
            .await;

        assert_eq!(result.content(), Some("static"));
        assert_eq!(renderer.calls(), 1);
        assert_eq!(direct.calls(), 1);
    }

    #[tokio::test]
    async fn refuses_private_targets_without_attempting() {
        let direct = Scripted::new("direct", vec![Ok("secret")]);
        let target = Url::parse("http://127.0.0.1:8080/admin").unwrap();
        let result = fetcher(direct.clone()).fetch(&target, &opts(3, false)).await;

        match result {
            FetchResult::Failure(f) => assert_eq!(f.attempts, 0),
            other => panic!("expected refusal, got {other:?}"),
        }
        assert_eq!(direct.calls(), 0);
    }

    #[tokio::test]
    async fn private_targets_allowed_when_configured() {
        let direct = Scripted::new("direct", vec![Ok("local")]);
        let target = Url::parse("http://127.0.0.1:8080/").unwrap();
        let result = fetcher(direct)
            .allow_private_hosts(true)
            .fetch(&target, &opts(1, false))
            .await;

        assert_eq!(result.content(), Some("local"));
    }

    #[tokio::test]
    async fn non_http_scheme_is_refused_even_when_private_allowed() {
        let direct = Scripted::new("direct", vec![Ok("nope")]);
        let target = Url::parse("file:///etc/hosts").unwrap();
        let result = fetcher(direct.clone())
            .allow_private_hosts(true)
            .fetch(&target, &opts(1, false))
            .await;

        assert!(result.content().is_none());
        assert_eq!(direct.calls(), 0);
    }

    #[tokio::test]
    async fn backoff_grows_linearly() {
        let direct = Scripted::new("direct", vec![Err("a"), Err("b"), Err("c")]);
        let fetcher = Fetcher::new(direct).with_backoff_unit(Duration::from_millis(20));

        let started = std::time::Instant::now();
        let result = fetcher.fetch(&url(), &opts(3, false)).await;

        assert!(result.content().is_none());
        // 20ms after attempt 1, 40ms after attempt 2, nothing after the last.
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
