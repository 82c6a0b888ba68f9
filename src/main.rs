// Command-line entry point: discover result URLs for each query, then harvest
// the answers behind every discovered URL into CSV files.

use anyhow::{Context, Result, bail};
use answer_harvest::{ChromiumProvider, HarvestConfig, Harvester, ProxySettings};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "answer-harvest")]
#[command(about = "Harvest search results and their answers into CSV files")]
#[command(version)]
struct Cli {
    /// Search queries, one discovery job each
    queries: Vec<String>,

    /// File with one query per line (blank lines and `#` comments are ignored)
    #[arg(long)]
    queries_file: Option<PathBuf>,

    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Domain discovered URLs must belong to
    #[arg(short, long, default_value = "quora.com")]
    domain: String,

    #[arg(long, default_value_t = 3)]
    discovery_concurrency: usize,

    #[arg(long, default_value_t = 5)]
    answer_concurrency: usize,

    /// Attempts per job, including the first
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    #[arg(long, default_value_t = 2000)]
    retry_delay_ms: u64,

    /// Pending records per sink before an automatic flush
    #[arg(long, default_value_t = 50)]
    flush_threshold: usize,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Proxy/rendering service endpoint; targets are fetched through it when set
    #[arg(long, requires = "proxy_key")]
    proxy_endpoint: Option<String>,

    #[arg(long, env = "HARVEST_PROXY_KEY", hide_env_values = true)]
    proxy_key: Option<String>,

    #[arg(long)]
    proxy_country: Option<String>,

    /// Time the proxy lets pages render before returning them
    #[arg(long)]
    proxy_wait_ms: Option<u64>,

    /// Skip records already present in existing output files
    #[arg(long)]
    resume: bool,
}

impl Cli {
    async fn load_queries(&self) -> Result<Vec<String>> {
        let mut queries = self.queries.clone();
        if let Some(path) = &self.queries_file {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read queries file {}", path.display()))?;
            queries.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }
        if queries.is_empty() {
            bail!("No queries given; pass them as arguments or with --queries-file");
        }
        Ok(queries)
    }

    fn proxy(&self) -> Option<ProxySettings> {
        let endpoint = self.proxy_endpoint.as_ref()?;
        let mut proxy = ProxySettings::new(endpoint, self.proxy_key.clone().unwrap_or_default());
        proxy.country.clone_from(&self.proxy_country);
        proxy.render_wait_ms = self.proxy_wait_ms;
        Some(proxy)
    }

    fn build_config(&self) -> Result<HarvestConfig> {
        let config = HarvestConfig::builder()
            .output_dir(&self.output_dir)
            .target_domain(&self.domain)
            .discovery_concurrency(self.discovery_concurrency)
            .answer_concurrency(self.answer_concurrency)
            .max_attempts(self.max_attempts)
            .retry_delay_ms(self.retry_delay_ms)
            .flush_threshold(self.flush_threshold)
            .headless(!self.headed)
            .proxy(self.proxy())
            .resume_from_existing(self.resume)
            .build()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let queries = cli.load_queries().await?;
    let config = cli.build_config().context("Invalid configuration")?;

    info!(
        "Harvesting {} queries on {} into {}",
        queries.len(),
        config.target_domain(),
        config.output_dir().display()
    );

    let provider = ChromiumProvider::launch(&config)
        .await
        .context("Failed to launch browser")?;

    let result = match Harvester::new(&provider, config) {
        Ok(harvester) => harvester.run(&queries).await.map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };
    provider.shutdown().await;

    let report = result?;
    for failure in report
        .discovery
        .failures()
        .chain(report.answers.failures())
    {
        if let Some(e) = failure.error() {
            error!("{}: {e}", failure.target());
        }
    }
    info!(
        "Discovery {}/{} ok, {} URLs, answers {}/{} ok, {} answers saved",
        report.discovery.succeeded(),
        report.discovery.jobs(),
        report.discovered_urls,
        report.answers.succeeded(),
        report.answers.jobs(),
        report.answers.admitted()
    );

    Ok(())
}
