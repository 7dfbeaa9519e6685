//! Direct HTTP transport: one GET with a browser-like header set.

use async_trait::async_trait;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS,
    USER_AGENT,
};
use reqwest::{Client, redirect};
use tracing::debug;
use url::Url;

use sitesignal_shared::{FetchOptions, Result, SiteSignalError};

use crate::guard::is_private_target;
use crate::transport::Transport;

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we accept (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Plain HTTP transport. No script execution.
pub struct DirectTransport {
    client: Client,
    max_body_bytes: u64,
}

impl DirectTransport {
    /// Build a transport that refuses redirects into private networks.
    pub fn new() -> Result<Self> {
        Self::with_private_hosts(false)
    }

    /// Build a transport; `allow_private_hosts` also lets redirects land on
    /// loopback and private addresses.
    pub fn with_private_hosts(allow_private_hosts: bool) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect_policy(allow_private_hosts))
            .default_headers(browser_headers())
            .build()
            .map_err(|e| SiteSignalError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_body_bytes: MAX_RESPONSE_SIZE,
        })
    }

    pub fn with_max_body_bytes(mut self, max: u64) -> Self {
        self.max_body_bytes = max;
        self
    }
}

/// At most [`MAX_REDIRECTS`] hops, each one re-checked against the private-target guard.
fn redirect_policy(allow_private_hosts: bool) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error(format!("too many redirects (max {MAX_REDIRECTS})"))
        } else if !allow_private_hosts && is_private_target(attempt.url()) {
            let target = attempt.url().to_string();
            attempt.error(format!("redirect to private target refused: {target}"))
        } else {
            attempt.follow()
        }
    })
}

/// Headers a desktop browser sends on a top-level navigation.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &Url, opts: &FetchOptions) -> Result<String> {
        debug!(%url, "direct fetch");

        let mut response = self
            .client
            .get(url.as_str())
            .header(USER_AGENT, opts.user_agent.as_str())
            .timeout(opts.timeout)
            .send()
            .await
            .map_err(|e| SiteSignalError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiteSignalError::Network(format!("{url}: HTTP {status}")));
        }

        let max = self.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len > max {
                return Err(SiteSignalError::validation(format!(
                    "{url}: response too large ({len} bytes, max {max})"
                )));
            }
        }

        // Chunked bodies carry no length up front; enforce the cap while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SiteSignalError::Network(format!("{url}: body read failed: {e}")))?
        {
            if (body.len() + chunk.len()) as u64 > max {
                return Err(SiteSignalError::validation(format!(
                    "{url}: response exceeds {max} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
