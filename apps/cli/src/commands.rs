//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sitesignal_core::{
    AnalyzeOptions, BatchObserver, OpenRouterSummarizer, SiteAnalyzer, run_batch,
};
use sitesignal_extract::ValidatorSet;
use sitesignal_fetch::{Fetcher, RenderEngine};
use sitesignal_shared::{
    AppConfig, BatchEntry, FetchOptions, RenderConfig, SiteAnalysis, config_file_path,
    init_config, load_config, load_config_from,
};
use tracing::{info, warn};
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SiteSignal: privacy, security, and compliance signals from company websites.
#[derive(Parser)]
#[command(
    name = "sitesignal",
    version,
    about = "Fetch company websites, find their legal pages, and report privacy/security/compliance signals.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.sitesignal/sitesignal.toml.
    #[arg(long, env = "SITESIGNAL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Report output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ReportFormat {
    Markdown,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Analyze a single website.
    Analyze {
        /// Home page URL of the site.
        url: String,

        /// Skip the AI summary.
        #[arg(long)]
        no_ai: bool,

        /// Summary model (defaults to `openrouter.default_model`).
        #[arg(long)]
        model: Option<String>,

        /// Never launch a headless browser.
        #[arg(long)]
        no_render: bool,

        /// Report format.
        #[arg(short, long, default_value = "markdown")]
        format: ReportFormat,

        /// Write the report to a file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Analyze every URL listed in a file, one per line.
    Batch {
        /// File with one URL per line. Blank lines and `#` comments are ignored.
        file: PathBuf,

        /// Pause between sites in milliseconds (defaults to the config value).
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Directory for per-site and batch reports. Prints the batch report when omitted.
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Skip AI summaries.
        #[arg(long)]
        no_ai: bool,

        /// Summary model (defaults to `openrouter.default_model`).
        #[arg(long)]
        model: Option<String>,

        /// Never launch a headless browser.
        #[arg(long)]
        no_render: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so reports on stdout stay clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitesignal=info",
        1 => "sitesignal=debug",
        _ => "sitesignal=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Analyze {
            url,
            no_ai,
            model,
            no_render,
            format,
            out,
        } => {
            let config = resolve_config(config_path)?;
            cmd_analyze(
                &config,
                &url,
                !no_ai,
                model.as_deref(),
                !no_render,
                format,
                out.as_deref(),
            )
            .await
        }
        Command::Batch {
            file,
            delay_ms,
            out_dir,
            no_ai,
            model,
            no_render,
        } => {
            let config = resolve_config(config_path)?;
            let delay = Duration::from_millis(delay_ms.unwrap_or(config.batch.delay_ms));
            cmd_batch(&config, &file, delay, out_dir, !no_ai, model.as_deref(), !no_render).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Session: analyzer plus the render engine it may launch
// ---------------------------------------------------------------------------

struct Session {
    analyzer: SiteAnalyzer,
    engine: Option<Arc<RenderEngine>>,
    options: AnalyzeOptions,
}

impl Session {
    fn open(
        config: &AppConfig,
        use_ai: bool,
        model: Option<&str>,
        use_render: bool,
    ) -> Result<Self> {
        // The browser itself is launched on first use.
        let engine = (use_render && config.render.enabled)
            .then(|| Arc::new(RenderEngine::new(RenderConfig::from(config))));

        let fetcher = Fetcher::from_config(config, engine.clone())?;
        let mut analyzer =
            SiteAnalyzer::new(fetcher).with_validators(ValidatorSet::from(&config.validators));

        if use_ai {
            let mut summarizer = OpenRouterSummarizer::from_config(config)?;
            if let Some(model) = model {
                summarizer = summarizer.with_model(model);
            }
            info!(model = summarizer.model(), "AI summaries enabled");
            analyzer = analyzer.with_summarizer(Arc::new(summarizer));
        }

        let mut fetch = FetchOptions::from(config);
        if engine.is_none() {
            fetch.prefer_rendering = false;
        }

        Ok(Self {
            analyzer,
            engine,
            options: AnalyzeOptions { fetch, use_ai },
        })
    }

    async fn close(self) {
        if let Some(engine) = self.engine {
            engine.shutdown().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_analyze(
    config: &AppConfig,
    url: &str,
    use_ai: bool,
    model: Option<&str>,
    use_render: bool,
    format: ReportFormat,
    out: Option<&Path>,
) -> Result<()> {
    let parsed_url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    let session = Session::open(config, use_ai, model, use_render)?;

    info!(url, use_ai, use_render, "analyzing site");

    let spinner = spinner();
    spinner.set_message(format!("Analyzing {parsed_url}"));
    let result = session.analyzer.analyze(&parsed_url, &session.options).await;
    spinner.finish_and_clear();
    session.close().await;

    let analysis = result?;
    let report = render_site(&analysis, format)?;

    match out {
        Some(path) => {
            std::fs::write(path, report)
                .wrap_err_with(|| format!("cannot write report to '{}'", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{report}"),
    }

    Ok(())
}

async fn cmd_batch(
    config: &AppConfig,
    file: &Path,
    delay: Duration,
    out_dir: Option<PathBuf>,
    use_ai: bool,
    model: Option<&str>,
    use_render: bool,
) -> Result<()> {
    let listing = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("cannot read URL list '{}'", file.display()))?;
    let urls = parse_url_list(&listing);
    if urls.is_empty() {
        return Err(eyre!("no URLs found in '{}'", file.display()));
    }

    if let Some(dir) = &out_dir {
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("cannot create output directory '{}'", dir.display()))?;
    }

    let session = Session::open(config, use_ai, model, use_render)?;

    info!(
        sites = urls.len(),
        delay_ms = delay.as_millis() as u64,
        use_ai,
        use_render,
        "starting batch"
    );

    let progress = BatchProgress::new(urls.len(), out_dir.clone());
    let result = run_batch(&session.analyzer, &urls, &session.options, delay, &progress).await;
    progress.finish();
    session.close().await;

    let markdown = sitesignal_reports::batch_markdown(&result)?;

    match out_dir {
        Some(dir) => {
            let md_path = dir.join("batch.md");
            let json_path = dir.join("batch.json");
            std::fs::write(&md_path, markdown)
                .wrap_err_with(|| format!("cannot write '{}'", md_path.display()))?;
            std::fs::write(&json_path, sitesignal_reports::to_json_pretty(&result)?)
                .wrap_err_with(|| format!("cannot write '{}'", json_path.display()))?;

            println!();
            println!("  Batch complete");
            println!("  Run:        {}", result.run_id);
            println!("  Sites:      {}", result.total);
            println!("  Succeeded:  {}", result.successful);
            println!("  Failed:     {}", result.failed);
            println!("  Reports:    {}", dir.display());
            println!(
                "  Time:       {:.1}s",
                (result.finished_at - result.started_at).num_milliseconds() as f64 / 1000.0
            );
            println!();
        }
        None => print!("{markdown}"),
    }

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let source = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    println!("# {}", source.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering helpers
// ---------------------------------------------------------------------------

fn render_site(analysis: &SiteAnalysis, format: ReportFormat) -> Result<String> {
    Ok(match format {
        ReportFormat::Markdown => sitesignal_reports::site_markdown(analysis)?,
        ReportFormat::Json => sitesignal_reports::to_json_pretty(analysis)?,
    })
}

/// Non-empty, non-comment lines of a URL list, trimmed.
fn parse_url_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// `007-example-com.md` style file name for a batch entry.
fn site_report_name(index: usize, url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| "site".to_string());
    let slug: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("{:03}-{slug}.md", index + 1)
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

// ---------------------------------------------------------------------------
// Batch progress
// ---------------------------------------------------------------------------

/// Progress bar over the batch, writing each site's report as soon as it finishes.
struct BatchProgress {
    bar: ProgressBar,
    out_dir: Option<PathBuf>,
}

impl BatchProgress {
    fn new(total: usize, out_dir: Option<PathBuf>) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar, out_dir }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn write_site_report(&self, index: usize, entry: &BatchEntry) {
        let (Some(dir), Some(analysis)) = (&self.out_dir, &entry.analysis) else {
            return;
        };
        let path = dir.join(site_report_name(index, &entry.url));
        let written = sitesignal_reports::site_markdown(analysis)
            .map_err(|e| e.to_string())
            .and_then(|report| std::fs::write(&path, report).map_err(|e| e.to_string()));
        if let Err(error) = written {
            warn!(path = %path.display(), %error, "failed to write site report");
        }
    }
}

impl BatchObserver for BatchProgress {
    fn site_started(&self, _index: usize, _total: usize, url: &str) {
        self.bar.set_message(url.to_string());
    }

    fn site_completed(&self, index: usize, _total: usize, entry: &BatchEntry) {
        if !entry.success {
            self.bar.println(format!(
                "  failed: {} ({})",
                entry.url,
                entry.error.as_deref().unwrap_or("unknown error")
            ));
        }
        self.write_site_report(index, entry);
        self.bar.inc(1);
    }
}
