use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use research_fanout::config::{find_config_file, get_config, load_config, Config};
use research_fanout::models::{SearchRequest, SearchResponse, SourceType};
use research_fanout::Aggregator;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Research Fanout - Search arXiv, PubMed and CORE at once
#[derive(Parser, Debug)]
#[command(name = "research-fanout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search arXiv, PubMed and CORE concurrently and merge the results", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log line format (logs go to stderr)
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable lines
    Plain,
    /// One JSON object per line
    Json,
}

/// Result output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Full response envelope as JSON
    Json,
    /// Human-readable listing
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search every provider (or a subset) for papers
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Maximum results per provider
        #[arg(long, short = 'n')]
        max_results: Option<usize>,

        /// Provider to query (arxiv, pubmed, core); repeat for several
        #[arg(long = "provider", short = 'p')]
        providers: Vec<String>,

        /// Drop cross-provider duplicates
        #[arg(long)]
        dedupe: bool,

        /// Abandon providers still running after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Plain)]
        output: OutputFormat,
    },

    /// List providers and whether their credentials are configured
    #[command(alias = "ls")]
    Providers,

    /// Print the effective configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli);

    let config = resolve_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Search {
            query,
            max_results,
            providers,
            dedupe,
            timeout,
            output,
        } => {
            let aggregator =
                Aggregator::from_config(&config).context("Failed to initialize providers")?;

            let mut request = SearchRequest::new(query).deduplicate(dedupe);
            if let Some(max) = max_results {
                request = request.max_results(max);
            }
            if !providers.is_empty() {
                request = request.providers(providers);
            }

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted; abandoning in-flight providers");
                    on_interrupt.cancel();
                }
            });

            let response = aggregator
                .search_until(&request, cancel, timeout.map(Duration::from_secs))
                .await
                .context("Search failed")?;

            print_response(&response, output)?;
        }

        Commands::Providers => {
            let aggregator =
                Aggregator::from_config(&config).context("Failed to initialize providers")?;

            println!("{:<10} {:<8} {}", "ID", "NAME", "STATUS");
            for source_type in SourceType::ALL {
                let status = match aggregator.registry().get(source_type) {
                    Some(source) if source.is_configured() => "ready",
                    Some(_) => "missing credential",
                    None => "not registered",
                };
                println!("{:<10} {:<8} {}", source_type.id(), source_type.name(), status);
            }
        }

        Commands::Config => {
            let rendered = config
                .redacted()
                .to_toml()
                .context("Failed to render configuration")?;
            print!("{}", rendered);
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("research_fanout={}", env_filter)),
    );

    // stdout is reserved for results
    let fmt_layer = match cli.log_format {
        LogFormat::Plain => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Explicit `--config` path, then a discovered config file, then env/defaults
fn resolve_config(explicit: Option<&PathBuf>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    if let Some(path) = find_config_file() {
        tracing::info!("Using config file: {}", path.display());
        return load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    get_config().context("Failed to read configuration from environment")
}

fn print_response(response: &SearchResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?);
        }
        OutputFormat::Plain => {
            for paper in &response.papers {
                println!("[{}] {}", paper.source, paper.title);
                if !paper.authors.is_empty() {
                    println!("  Authors: {}", paper.authors.join(", "));
                }
                if let Some(ref date) = paper.published_date {
                    println!("  Published: {}", date);
                }
                println!("  URL: {}", paper.url);
                if let Some(ref doi) = paper.doi {
                    println!("  DOI: {}", doi);
                }
                if let Some(ref pdf_url) = paper.pdf_url {
                    println!("  PDF: {}", pdf_url);
                }
                println!();
            }

            println!("Providers:");
            for provider in &response.providers {
                let status = if provider.is_success() {
                    "ok".to_string()
                } else {
                    provider.error.clone()
                };
                println!(
                    "  {:<8} {:>3} papers {:>6} ms  {}",
                    provider.name,
                    provider.count,
                    provider.duration.as_millis(),
                    status
                );
            }
        }
    }

    Ok(())
}
