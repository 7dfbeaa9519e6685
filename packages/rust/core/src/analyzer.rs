//! Single-site analysis: main page, legal links, sub-pages, optional AI summary.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use url::{Host, Url};

use sitesignal_extract::{Page, ValidatorSet};
use sitesignal_fetch::Fetcher;
use sitesignal_shared::{
    AboutInfo, ContactInfo, ContentType, FetchOptions, LinkSet, Result, ScoredSummary,
    SignalCategory, Signals, SiteAnalysis, SiteSignalError, UNKNOWN_COMPANY,
};

use crate::summarizer::Summarizer;

/// Per-call analysis options.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub fetch: FetchOptions,
    /// Request an AI summary (ignored when no summarizer is configured).
    pub use_ai: bool,
}

/// Progress of one analysis. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Init,
    MainFetched,
    LinksClassified,
    SubpagesAnalyzed,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Init => "init",
            Stage::MainFetched => "main_fetched",
            Stage::LinksClassified => "links_classified",
            Stage::SubpagesAnalyzed => "subpages_analyzed",
            Stage::Done => "done",
            Stage::Failed => "failed",
        })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "analysis stage");
    *stage = next;
}

/// What the main page yields before any sub-page is fetched.
struct MainFindings {
    company_name: String,
    contact: ContactInfo,
    about: AboutInfo,
    links: LinkSet,
}

/// Signals and text from a fetched sub-page.
struct SubpageFindings {
    signals: Signals,
    text: String,
}

/// Runs the analysis pipeline for one site.
pub struct SiteAnalyzer {
    fetcher: Fetcher,
    summarizer: Option<Arc<dyn Summarizer>>,
    validators: ValidatorSet,
}

impl SiteAnalyzer {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            summarizer: None,
            validators: ValidatorSet::none(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_validators(mut self, validators: ValidatorSet) -> Self {
        self.validators = validators;
        self
    }

    /// Analyze `url`.
    ///
    /// Fails only if the main page cannot be fetched or is rejected by a
    /// validator. Sub-page and summarizer failures degrade the result instead.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn analyze(&self, url: &Url, opts: &AnalyzeOptions) -> Result<SiteAnalysis> {
        let mut stage = Stage::Init;

        let markup = match self.fetcher.fetch(url, &opts.fetch).await.into_result() {
            Ok(markup) => markup,
            Err(e) => {
                advance(&mut stage, Stage::Failed);
                return Err(e);
            }
        };
        advance(&mut stage, Stage::MainFetched);

        let main = match self.inspect_main(&markup, url) {
            Ok(main) => main,
            Err(e) => {
                advance(&mut stage, Stage::Failed);
                return Err(e);
            }
        };
        drop(markup);
        advance(&mut stage, Stage::LinksClassified);

        let mut links = main.links;

        let privacy = match &links.privacy_policy {
            Some(link) => self.fetch_subpage(link, "privacy policy", &opts.fetch).await,
            None => None,
        };
        if privacy.is_none() && links.privacy_policy_guessed {
            debug!("guessed privacy link did not resolve, clearing it");
            links.privacy_policy = None;
            links.privacy_policy_guessed = false;
        }

        let trust = match &links.trust_center {
            Some(link) => self.fetch_subpage(link, "trust center", &opts.fetch).await,
            None => None,
        };

        let privacy_summary = privacy
            .as_ref()
            .map_or_else(|| "Privacy policy not found".to_string(), |p| privacy_summary(&p.signals));
        let trust_summary = trust
            .as_ref()
            .map_or_else(|| "Trust center not found".to_string(), |t| trust_summary(&t.signals));
        advance(&mut stage, Stage::SubpagesAnalyzed);

        let ai_summary = if opts.use_ai {
            self.summarize(
                privacy.as_ref().map(|p| p.text.as_str()),
                trust.as_ref().map(|t| t.text.as_str()),
            )
            .await
        } else {
            None
        };

        let signals = privacy.map_or_else(Signals::empty, |p| p.signals);
        advance(&mut stage, Stage::Done);

        info!(
            company = %main.company_name,
            signals = signals.total(),
            ai = ai_summary.is_some(),
            "site analyzed"
        );

        Ok(SiteAnalysis {
            company_name: main.company_name,
            main_url: url.clone(),
            links,
            contact: main.contact,
            about: main.about,
            signals,
            privacy_summary,
            trust_summary,
            ai_summary,
            fetched_at: Utc::now(),
        })
    }

    /// Main-page extraction and validation. Synchronous: the parsed page never
    /// crosses an await point.
    fn inspect_main(&self, markup: &str, url: &Url) -> Result<MainFindings> {
        let page = Page::parse(markup);

        let verdict = self.validators.check_content(page.text());
        if !verdict.accepted {
            return Err(SiteSignalError::validation(format!(
                "{url}: main page rejected: {}",
                verdict.reason.unwrap_or_default()
            )));
        }

        let mut company_name = page.company_name();
        let verdict = self.validators.check_company_name(&company_name);
        if !verdict.accepted {
            let replacement = name_from_host(url);
            debug!(
                rejected = %company_name,
                reason = verdict.reason.as_deref().unwrap_or_default(),
                %replacement,
                "replacing generic company name"
            );
            company_name = replacement;
        }

        Ok(MainFindings {
            company_name,
            contact: page.contact(),
            about: page.about(),
            links: sitesignal_discovery::classify(markup, url),
        })
    }

    /// Fetch a sub-page; failure is logged and reported as `None`.
    async fn fetch_subpage(
        &self,
        link: &Url,
        label: &str,
        opts: &FetchOptions,
    ) -> Option<SubpageFindings> {
        match self.fetcher.fetch(link, opts).await.into_result() {
            Ok(markup) => Some(inspect_subpage(&markup)),
            Err(e) => {
                warn!(page = label, %link, error = %e, "sub-page unavailable");
                None
            }
        }
    }

    /// Privacy content first; trust content only if that produced nothing.
    async fn summarize(&self, privacy: Option<&str>, trust: Option<&str>) -> Option<ScoredSummary> {
        let summarizer = self.summarizer.as_ref()?;

        let candidates = [
            (privacy, ContentType::PrivacyPolicy),
            (trust, ContentType::TrustCenter),
        ];

        for (text, content_type) in candidates {
            let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            match summarizer.summarize(text, content_type).await {
                Ok(summary) => return Some(summary),
                Err(e) => {
                    warn!(content_type = content_type.as_str(), error = %e, "AI summary unavailable");
                }
            }
        }

        None
    }
}

fn inspect_subpage(markup: &str) -> SubpageFindings {
    let page = Page::parse(markup);
    SubpageFindings {
        signals: page.signals(),
        text: page.text().to_string(),
    }
}

/// Templated privacy sentence with per-category counts.
pub fn privacy_summary(signals: &Signals) -> String {
    format!(
        "Privacy policy found: {} data collection, {} data sharing, {} user rights, \
         {} security, {} compliance signals.",
        signals.count(SignalCategory::DataCollection),
        signals.count(SignalCategory::DataSharing),
        signals.count(SignalCategory::UserRights),
        signals.count(SignalCategory::SecurityMeasures),
        signals.count(SignalCategory::Compliance),
    )
}

/// Templated trust sentence; only security and compliance counts are reported.
pub fn trust_summary(signals: &Signals) -> String {
    format!(
        "Trust center found: {} security and {} compliance signals.",
        signals.count(SignalCategory::SecurityMeasures),
        signals.count(SignalCategory::Compliance),
    )
}

/// `https://www.acme.example/` → `"Acme"`. IP hosts are returned as-is.
fn name_from_host(url: &Url) -> String {
    let domain = match url.host() {
        Some(Host::Domain(domain)) => domain,
        Some(ip) => return ip.to_string(),
        None => return UNKNOWN_COMPANY.to_string(),
    };
    let domain = domain.strip_prefix("www.").unwrap_or(domain);
    let label = domain.split('.').next().unwrap_or(domain);

    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => UNKNOWN_COMPANY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubSummarizer, load_fixture, local_fetcher, options, serve};
    use sitesignal_shared::ValidatorConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn host_names() {
        let url = Url::parse("https://www.acme.example/").unwrap();
        assert_eq!(name_from_host(&url), "Acme");

        let url = Url::parse("http://globex.co.uk/about").unwrap();
        assert_eq!(name_from_host(&url), "Globex");

        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(name_from_host(&url), "127.0.0.1");
    }

    #[test]
    fn summary_templates() {
        let empty = Signals::empty();
        assert_eq!(
            privacy_summary(&empty),
            "Privacy policy found: 0 data collection, 0 data sharing, 0 user rights, \
             0 security, 0 compliance signals."
        );
        assert_eq!(
            trust_summary(&empty),
            "Trust center found: 0 security and 0 compliance signals."
        );
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::LinksClassified.to_string(), "links_classified");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }

    /// Home page whose trust link stays on the mock server.
    async fn serve_acme(server: &MockServer) {
        let home = load_fixture("company_home.html").replace("https://trust.acme.example/", "/trust");
        serve(server, "/", home).await;
        serve(server, "/privacy-policy", load_fixture("privacy_policy.html")).await;
        serve(server, "/trust", load_fixture("trust_center.html")).await;
    }

    #[tokio::test]
    async fn analyzes_full_site() {
        let server = MockServer::start().await;
        serve_acme(&server).await;

        let url = Url::parse(&server.uri()).unwrap();
        let analysis = SiteAnalyzer::new(local_fetcher())
            .analyze(&url, &options(false))
            .await
            .unwrap();

        assert_eq!(analysis.company_name, "Acme Analytics");
        assert_eq!(analysis.main_url, url);
        assert_eq!(
            analysis.links.privacy_policy,
            Some(url.join("/privacy-policy").unwrap())
        );
        assert_eq!(analysis.links.trust_center, Some(url.join("/trust").unwrap()));
        assert_eq!(
            analysis.links.terms_of_service,
            Some(url.join("/terms-of-service").unwrap())
        );
        assert!(!analysis.links.privacy_policy_guessed);

        assert_eq!(
            analysis.privacy_summary,
            "Privacy policy found: 4 data collection, 2 data sharing, 2 user rights, \
             1 security, 2 compliance signals."
        );
        assert_eq!(
            analysis.trust_summary,
            "Trust center found: 2 security and 3 compliance signals."
        );

        // Buckets come from the privacy page only.
        assert_eq!(analysis.signals.count(SignalCategory::Compliance), 2);
        assert_eq!(analysis.signals.count(SignalCategory::SecurityMeasures), 1);

        assert_eq!(analysis.contact.emails.len(), 3);
        assert_eq!(analysis.contact.phones.len(), 2);
        assert!(analysis.about.description.is_some());
        assert!(analysis.ai_summary.is_none());
    }

    #[tokio::test]
    async fn main_page_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = SiteAnalyzer::new(local_fetcher())
            .analyze(&url, &options(false))
            .await
            .unwrap_err();

        match err {
            SiteSignalError::Fetch { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected fetch error, got {other}"),
        }
    }

    #[tokio::test]
    async fn site_without_links_reports_not_found() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            "<html><head><title>Plain Co</title></head><body><p>Nothing to see.</p></body></html>",
        )
        .await;
        // The guessed /privacy is not mounted and returns 404.

        let url = Url::parse(&server.uri()).unwrap();
        let analysis = SiteAnalyzer::new(local_fetcher())
            .analyze(&url, &options(false))
            .await
            .unwrap();

        assert!(analysis.links.is_empty());
        assert!(!analysis.links.privacy_policy_guessed);
        assert_eq!(analysis.privacy_summary, "Privacy policy not found");
        assert_eq!(analysis.trust_summary, "Trust center not found");
        assert_eq!(analysis.signals.0.len(), 5);
        assert!(analysis.signals.is_empty());
    }

    #[tokio::test]
    async fn guessed_privacy_link_is_kept_when_it_exists() {
        let server = MockServer::start().await;
        serve(&server, "/", "<html><body><h1>Quiet Co</h1></body></html>").await;
        serve(&server, "/privacy", "<p>We use cookies.</p>").await;

        let url = Url::parse(&server.uri()).unwrap();
        let analysis = SiteAnalyzer::new(local_fetcher())
            .analyze(&url, &options(false))
            .await
            .unwrap();

        assert_eq!(analysis.links.privacy_policy, Some(url.join("/privacy").unwrap()));
        assert!(analysis.links.privacy_policy_guessed);
        assert_eq!(analysis.signals.count(SignalCategory::DataCollection), 1);
    }

    #[tokio::test]
    async fn minimal_privacy_policy_signals() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            r#"<html><body><footer><a href="/legal-privacy">Privacy</a></footer></body></html>"#,
        )
        .await;
        serve(
            &server,
            "/legal-privacy",
            "<html><body><p>We collect data under GDPR.</p></body></html>",
        )
        .await;

        let url = Url::parse(&server.uri()).unwrap();
        let analysis = SiteAnalyzer::new(local_fetcher())
            .analyze(&url, &options(false))
            .await
            .unwrap();

        let signals = &analysis.signals;
        assert_eq!(signals.count(SignalCategory::DataCollection), 1);
        assert_eq!(signals.count(SignalCategory::Compliance), 1);
        assert_eq!(signals.count(SignalCategory::DataSharing), 0);
        assert_eq!(signals.count(SignalCategory::UserRights), 0);
        assert_eq!(signals.count(SignalCategory::SecurityMeasures), 0);
    }

    #[tokio::test]
    async fn failed_privacy_page_is_not_fatal() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            r#"<html><head><title>Acme</title></head><body><a href="/privacy-notice">Privacy</a></body></html>"#,
        )
        .await;

        let url = Url::parse(&server.uri()).unwrap();
        let analysis = SiteAnalyzer::new(local_fetcher())
            .analyze(&url, &options(false))
            .await
            .unwrap();

        // A real anchor is kept even though its page could not be fetched.
        assert_eq!(
            analysis.links.privacy_policy,
            Some(url.join("/privacy-notice").unwrap())
        );
        assert_eq!(analysis.privacy_summary, "Privacy policy not found");
        assert!(analysis.signals.is_empty());
    }

    #[tokio::test]
    async fn ai_summary_prefers_privacy_content() {
        let server = MockServer::start().await;
        serve_acme(&server).await;

        let stub = StubSummarizer::with_scores(&[8]);
        let url = Url::parse(&server.uri()).unwrap();
        let analysis = SiteAnalyzer::new(local_fetcher())
            .with_summarizer(stub.clone())
            .analyze(&url, &options(true))
            .await
            .unwrap();

        let ai = analysis.ai_summary.unwrap();
        assert_eq!(ai.source, ContentType::PrivacyPolicy);
        assert_eq!(ai.privacy_score, 8);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn ai_summary_falls_back_to_trust_content() {
        let server = MockServer::start().await;
        serve_acme(&server).await;

        let stub = StubSummarizer::failing_for(ContentType::PrivacyPolicy, &[6]);
        let url = Url::parse(&server.uri()).unwrap();
        let analysis = SiteAnalyzer::new(local_fetcher())
            .with_summarizer(stub.clone())
            .analyze(&url, &options(true))
            .await
            .unwrap();

        assert_eq!(analysis.ai_summary.unwrap().source, ContentType::TrustCenter);
        assert_eq!(
            stub.seen(),
            vec![ContentType::PrivacyPolicy, ContentType::TrustCenter]
        );
    }

    #[tokio::test]
    async fn summarizer_not_called_without_ai_or_content() {
        let server = MockServer::start().await;
        serve_acme(&server).await;
        let url = Url::parse(&server.uri()).unwrap();

        let stub = StubSummarizer::with_scores(&[9]);
        let analyzer = SiteAnalyzer::new(local_fetcher()).with_summarizer(stub.clone());
        let analysis = analyzer.analyze(&url, &options(false)).await.unwrap();
        assert!(analysis.ai_summary.is_none());
        assert_eq!(stub.calls(), 0);

        // AI requested, but the site has no privacy or trust page.
        let bare = MockServer::start().await;
        serve(&bare, "/", "<html><body><p>hello</p></body></html>").await;
        let bare_url = Url::parse(&bare.uri()).unwrap();
        let analysis = analyzer.analyze(&bare_url, &options(true)).await.unwrap();
        assert!(analysis.ai_summary.is_none());
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn placeholder_page_is_rejected_when_enabled() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            "<html><body><p>Lorem ipsum dolor sit amet, consectetur adipiscing elit.</p></body></html>",
        )
        .await;

        let validators = ValidatorSet::from(&ValidatorConfig {
            placeholder_content: true,
            generic_company_name: false,
            min_text_chars: 10,
        });
        let url = Url::parse(&server.uri()).unwrap();
        let err = SiteAnalyzer::new(local_fetcher())
            .with_validators(validators)
            .analyze(&url, &options(false))
            .await
            .unwrap_err();

        assert!(matches!(err, SiteSignalError::Validation { .. }));
    }

    #[tokio::test]
    async fn generic_company_name_is_replaced_when_enabled() {
        let server = MockServer::start().await;
        serve(&server, "/", "<html><head><title>Home</title></head><body></body></html>").await;

        let validators = ValidatorSet::from(&ValidatorConfig {
            placeholder_content: false,
            generic_company_name: true,
            min_text_chars: 0,
        });
        let url = Url::parse(&server.uri()).unwrap();
        let analysis = SiteAnalyzer::new(local_fetcher())
            .with_validators(validators)
            .analyze(&url, &options(false))
            .await
            .unwrap();

        assert_eq!(analysis.company_name, "127.0.0.1");
    }
}
