//! Headless Chrome rendering.
//!
//! [`RenderEngine`] owns at most one browser process. It is launched on first
//! use, relaunched after a disconnect, and closed only by [`RenderEngine::shutdown`].
//! A failed launch disables rendering for the rest of the run.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use sitesignal_shared::{FetchOptions, RenderConfig, Result, SiteSignalError};

use crate::transport::Transport;

/// Chrome exits on its own after this long without a command.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

enum EngineState {
    /// Not launched yet, or the previous browser disconnected.
    Idle,
    Ready(Arc<Browser>),
    /// Launch failed or rendering is disabled. Permanent.
    Unavailable,
    ShutDown,
}

/// Lazily launched, process-wide headless browser handle.
pub struct RenderEngine {
    config: RenderConfig,
    state: Mutex<EngineState>,
    checks: AtomicUsize,
}

impl RenderEngine {
    pub fn new(config: RenderConfig) -> Self {
        let state = if config.enabled {
            EngineState::Idle
        } else {
            EngineState::Unavailable
        };
        Self {
            config,
            state: Mutex::new(state),
            checks: AtomicUsize::new(0),
        }
    }

    /// An engine that never launches a browser.
    pub fn disabled() -> Self {
        Self::new(RenderConfig {
            enabled: false,
            ..RenderConfig::default()
        })
    }

    /// Delay after navigation before the DOM is captured.
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.config.settle_ms)
    }

    /// Return a connected browser, launching one if needed.
    ///
    /// `None` means rendering cannot serve this attempt. After a disconnect the
    /// handle is cleared, so the next call launches a fresh browser.
    pub async fn browser(&self) -> Option<Arc<Browser>> {
        let check = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.state.lock().await;
        debug!(check, "render engine check");

        match &*state {
            EngineState::Unavailable | EngineState::ShutDown => None,
            EngineState::Ready(browser) => {
                let handle = Arc::clone(browser);
                let connected = tokio::task::spawn_blocking(move || handle.get_version().is_ok())
                    .await
                    .unwrap_or(false);

                if connected {
                    Some(Arc::clone(browser))
                } else {
                    warn!("headless browser disconnected, will relaunch on next attempt");
                    *state = EngineState::Idle;
                    None
                }
            }
            EngineState::Idle => {
                let config = self.config.clone();
                let launched = tokio::task::spawn_blocking(move || launch(&config))
                    .await
                    .map_err(|e| SiteSignalError::Render(format!("launch task failed: {e}")))
                    .and_then(|r| r);

                match launched {
                    Ok(browser) => {
                        info!("headless browser launched");
                        let browser = Arc::new(browser);
                        *state = EngineState::Ready(Arc::clone(&browser));
                        Some(browser)
                    }
                    Err(e) => {
                        warn!(error = %e, "headless browser unavailable, falling back to direct fetch");
                        *state = EngineState::Unavailable;
                        None
                    }
                }
            }
        }
    }

    /// Close the browser if one is running. Further calls to [`Self::browser`] return `None`.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state.lock().await, EngineState::ShutDown);

        if let EngineState::Ready(browser) = previous {
            // Dropping the last handle kills the Chrome process, which can block.
            if tokio::task::spawn_blocking(move || drop(browser)).await.is_err() {
                warn!("headless browser shutdown task panicked");
            }
            info!("headless browser closed");
        }
    }
}

fn launch(config: &RenderConfig) -> Result<Browser> {
    let in_container =
        std::env::var_os("SITESIGNAL_CONTAINER").is_some() || Path::new("/.dockerenv").exists();

    let chrome_path = config
        .chrome_path
        .clone()
        .or_else(|| std::env::var_os("CHROME_PATH").map(PathBuf::from));

    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(config.sandbox && !in_container)
        .path(chrome_path)
        .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
        .build()
        .map_err(|e| SiteSignalError::Render(format!("invalid Chrome launch options: {e}")))?;

    Browser::new(options)
        .map_err(|e| SiteSignalError::Render(format!("failed to launch headless Chrome: {e}")))
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Renders pages in a fresh tab of the shared browser.
///
/// Each attempt runs under one deadline of `opts.timeout`. The tab is held by
/// the async side and closed before `fetch` returns, whether the attempt
/// succeeded, failed, or timed out.
pub struct RenderTransport {
    engine: Arc<RenderEngine>,
    /// Result of the last `is_available` check, consumed by the next `fetch`.
    checked: std::sync::Mutex<Option<Option<Arc<Browser>>>>,
}

impl RenderTransport {
    pub fn new(engine: Arc<RenderEngine>) -> Self {
        Self {
            engine,
            checked: std::sync::Mutex::new(None),
        }
    }

    /// The browser confirmed by the preceding availability check, or a fresh check.
    async fn acquire(&self) -> Result<Arc<Browser>> {
        let checked = self.checked.lock().ok().and_then(|mut slot| slot.take());
        let browser = match checked {
            Some(browser) => browser,
            None => self.engine.browser().await,
        };
        browser.ok_or_else(|| SiteSignalError::Render("headless browser unavailable".into()))
    }
}

#[async_trait]
impl Transport for RenderTransport {
    fn name(&self) -> &'static str {
        "render"
    }

    async fn is_available(&self) -> bool {
        let browser = self.engine.browser().await;
        let available = browser.is_some();
        if let Ok(mut slot) = self.checked.lock() {
            *slot = Some(browser);
        }
        available
    }

    async fn fetch(&self, url: &Url, opts: &FetchOptions) -> Result<String> {
        let browser = self.acquire().await?;
        let deadline = Instant::now() + opts.timeout;

        let tab = open_tab(browser, url, opts, deadline).await?;
        let handle = tab.handle();
        within_tab(tab, load_page(handle, url.clone(), self.engine.settle(), deadline)).await
    }
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

/// Upper bound on closing a tab after an attempt.
const TAB_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// A browser resource an attempt must release before it returns.
trait Release: Send + Sync + 'static {
    fn release(&self) -> std::result::Result<(), String>;
}

impl Release for Tab {
    fn release(&self) -> std::result::Result<(), String> {
        self.close(false).map(|_| ()).map_err(|e| e.to_string())
    }
}

/// A tab owned by the async side of an attempt.
struct OpenTab<T: Release = Tab> {
    tab: Arc<T>,
    released: bool,
}

impl<T: Release> OpenTab<T> {
    fn new(tab: Arc<T>) -> Self {
        Self {
            tab,
            released: false,
        }
    }

    fn handle(&self) -> Arc<T> {
        Arc::clone(&self.tab)
    }

    /// Close the tab and wait (briefly) for Chrome to confirm.
    async fn close(mut self) {
        self.released = true;
        let tab = Arc::clone(&self.tab);
        match tokio::time::timeout(TAB_CLOSE_TIMEOUT, tokio::task::spawn_blocking(move || tab.release()))
            .await
        {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => debug!(error = %e, "failed to close render tab"),
            Ok(Err(e)) => debug!(error = %e, "render tab close task failed"),
            Err(_) => warn!("closing render tab timed out"),
        }
    }
}

impl<T: Release> Drop for OpenTab<T> {
    fn drop(&mut self) {
        // Reached only when the attempt future itself is dropped mid-flight.
        if self.released {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let tab = Arc::clone(&self.tab);
            runtime.spawn_blocking(move || {
                if let Err(e) = tab.release() {
                    debug!(error = %e, "failed to close abandoned render tab");
                }
            });
        }
    }
}

/// Run `work` against an open tab, then close the tab whatever the outcome.
async fn within_tab<T, R, F>(tab: OpenTab<T>, work: F) -> Result<R>
where
    T: Release,
    F: Future<Output = Result<R>>,
{
    let result = work.await;
    tab.close().await;
    result
}

/// Run blocking browser work until `deadline`. On timeout the blocking call is
/// left behind; closing its tab makes it fail soon after.
async fn blocking_until<R, F>(deadline: Instant, url: &Url, stage: &str, work: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce() -> std::result::Result<R, String> + Send + 'static,
{
    match tokio::time::timeout_at(deadline, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(SiteSignalError::Render(format!("{url}: {stage} failed: {e}"))),
        Ok(Err(e)) => Err(SiteSignalError::Render(format!("{url}: {stage} task failed: {e}"))),
        Err(_) => Err(SiteSignalError::Render(format!("{url}: render timed out during {stage}"))),
    }
}

async fn open_tab(
    browser: Arc<Browser>,
    url: &Url,
    opts: &FetchOptions,
    deadline: Instant,
) -> Result<OpenTab> {
    let user_agent = opts.user_agent.clone();
    let timeout = opts.timeout;
    let mut opening = tokio::task::spawn_blocking(move || new_tab(&browser, &user_agent, timeout));

    match tokio::time::timeout_at(deadline, &mut opening).await {
        Ok(Ok(Ok(tab))) => Ok(OpenTab::new(tab)),
        Ok(Ok(Err(e))) => Err(SiteSignalError::Render(format!("{url}: open tab failed: {e}"))),
        Ok(Err(e)) => Err(SiteSignalError::Render(format!("{url}: open tab task failed: {e}"))),
        Err(_) => {
            // The tab may still appear; close it as soon as it does.
            tokio::spawn(async move {
                if let Ok(Ok(tab)) = opening.await {
                    OpenTab::new(tab).close().await;
                }
            });
            Err(SiteSignalError::Render(format!("{url}: render timed out opening a tab")))
        }
    }
}

fn new_tab(browser: &Browser, user_agent: &str, timeout: Duration) -> std::result::Result<Arc<Tab>, String> {
    let tab = browser.new_tab().map_err(|e| e.to_string())?;
    tab.set_default_timeout(timeout);
    if let Err(e) = tab.set_user_agent(user_agent, None, None) {
        if let Err(close) = tab.close(false) {
            debug!(error = %close, "failed to close render tab");
        }
        return Err(format!("set user agent: {e}"));
    }
    Ok(tab)
}

async fn load_page(tab: Arc<Tab>, url: Url, settle: Duration, deadline: Instant) -> Result<String> {
    let navigating = Arc::clone(&tab);
    let target = url.to_string();
    blocking_until(deadline, &url, "navigate", move || {
        navigating
            .navigate_to(&target)
            .and_then(|t| t.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| e.to_string())
    })
    .await?;

    // Give late scripts and XHR-driven content a moment to land.
    tokio::time::sleep_until(deadline.min(Instant::now() + settle)).await;

    blocking_until(deadline, &url, "read content", move || {
        tab.get_content().map_err(|e| e.to_string())
    })
    .await
}
