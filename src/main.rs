use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use normdoc_status::config::{
    default_config_path, find_config_file, load_config, save_config, Config, ENV_PREFIX,
};
use normdoc_status::enrich::{BatchFailure, Enricher};
use normdoc_status::models::{read_citations, Citation, EnrichedCitation, InputFormat};
use normdoc_status::sources::CheckerRegistry;
use is_terminal::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// normdoc-status - Check whether cited regulatory documents are still in force
#[derive(Parser, Debug)]
#[command(name = "normdoc-status")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check the legal-force status of Russian regulatory-document citations", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum concurrent lookups (overrides the config file)
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Log line format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

/// Citation input encoding
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum InputFormatArg {
    /// `.json` files are JSON, everything else is extractor lines
    Auto,
    /// JSON array of citation records
    Json,
    /// `type; number от date; status` lines from the extractor (status is ignored)
    Lines,
}

impl From<InputFormatArg> for InputFormat {
    fn from(arg: InputFormatArg) -> Self {
        match arg {
            InputFormatArg::Auto => InputFormat::Auto,
            InputFormatArg::Json => InputFormat::Json,
            InputFormatArg::Lines => InputFormat::Lines,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the status of every citation in a file
    Enrich {
        /// Citation file
        input: PathBuf,

        /// Input encoding
        #[arg(long, value_enum, default_value_t = InputFormatArg::Auto)]
        input_format: InputFormatArg,

        /// Also write the enriched records as JSON to this file
        #[arg(long)]
        output_file: Option<PathBuf>,

        /// Print citations dropped because their lookup failed
        #[arg(long)]
        report: bool,
    },

    /// Resolve the status of a single citation
    Check {
        /// Document type, e.g. "Постановление Правительства РФ"
        #[arg(long, short = 't')]
        doc_type: String,

        /// Document number
        #[arg(long, short)]
        number: String,

        /// Issue date (dd.mm.yyyy)
        #[arg(long, short)]
        date: Option<String>,

        /// Ask this checker directly instead of following the routing table
        #[arg(long, short)]
        checker: Option<String>,
    },

    /// List status checkers and the routing table
    #[command(alias = "list")]
    Sources,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write the default configuration to a file
    Init {
        /// Destination (defaults to the user config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// Print all available environment variables
fn print_env_vars() {
    println!("normdoc-status - Environment Variables");
    println!();
    println!("Configuration overrides ({}_<SECTION>__<KEY>):", ENV_PREFIX);
    println!("  {}_HTTP__TIMEOUT_SECS                     Request timeout in seconds (default: 10)", ENV_PREFIX);
    println!("  {}_HTTP__CONNECT_TIMEOUT_SECS             Connect timeout in seconds (default: 10)", ENV_PREFIX);
    println!("  {}_HTTP__USER_AGENT                       User-Agent header", ENV_PREFIX);
    println!("  {}_HTTP__REQUESTS_PER_SECOND              Client-side rate limit (default: unlimited)", ENV_PREFIX);
    println!("  {}_CONCURRENCY__MAX_CONCURRENT_LOOKUPS    Lookups in flight at once (default: 5)", ENV_PREFIX);
    println!("  {}_SOURCES__PRAVO_BASE_URL                Official portal base URL", ENV_PREFIX);
    println!("  {}_SOURCES__GOVERNMENT_BASE_URL           government.ru base URL", ENV_PREFIX);
    println!("  {}_SOURCES__CONSULTANT_BASE_URL           ConsultantPlus base URL", ENV_PREFIX);
    println!("  {}_LOGGING__LEVEL                         Log level (default: info)", ENV_PREFIX);
    println!("  {}_LOGGING__FORMAT                        text or json", ENV_PREFIX);
    println!();
    println!("Global Proxy Settings:");
    println!("  HTTP_PROXY                  HTTP proxy URL (e.g., http://proxy:8080)");
    println!("  HTTPS_PROXY                 HTTPS proxy URL (e.g., https://proxy:8080)");
    println!("  NO_PROXY                    Comma-separated list of hosts to bypass proxy");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging filter (overrides -v, -q and the config level)");
    println!();
    println!("Example:");
    println!("  export {}_CONCURRENCY__MAX_CONCURRENT_LOOKUPS=\"3\"", ENV_PREFIX);
    std::process::exit(0);
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config
            .logging
            .format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json")),
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("normdoc_status={}", level)),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn load_effective_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(path.as_deref())
        .with_context(|| match &path {
            Some(p) => format!("Failed to load config from {}", p.display()),
            None => "Failed to load config from the environment".to_string(),
        })?;

    apply_overrides(cli, &mut config);
    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency.max_concurrent_lookups = concurrency;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
    }

    let config = load_effective_config(&cli)?;
    init_tracing(&cli, &config);

    if let Some(path) = cli.config.clone().or_else(find_config_file) {
        tracing::debug!("Using config file: {}", path.display());
    }

    match cli.command {
        Some(Commands::Enrich {
            ref input,
            input_format,
            ref output_file,
            report,
        }) => {
            let citations = read_citations(input, input_format.into())
                .with_context(|| format!("Failed to read citations from {}", input.display()))?;
            tracing::info!(count = citations.len(), "Loaded citations");

            let registry = CheckerRegistry::from_config(&config)?;
            let enricher = Enricher::from_config(&config, &registry)?;

            let batch = tokio::select! {
                batch = enricher.enrich_batch_report(citations) => batch,
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted, cancelling outstanding lookups");
                    anyhow::bail!("Interrupted");
                }
            };

            let stats = enricher.cache().stats();
            tracing::info!(
                enriched = batch.enriched.len(),
                dropped = batch.failures.len(),
                cache_hits = stats.hits,
                cache_misses = stats.misses,
                "Enrichment finished"
            );

            if let Some(path) = output_file {
                let json = serde_json::to_string_pretty(&batch.enriched)?;
                std::fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!("Wrote {}", path.display());
            }

            output_citations(&batch.enriched, cli.output)?;

            if report {
                print_failures(&batch.failures);
            }
        }

        Some(Commands::Check {
            ref doc_type,
            ref number,
            ref date,
            ref checker,
        }) => {
            let mut citation = Citation::new(doc_type.as_str(), number.as_str());
            if let Some(date) = date {
                citation = citation.with_date(date.as_str());
            }

            let registry = CheckerRegistry::from_config(&config)?;
            let enriched = match checker {
                Some(id) => {
                    let checker = registry.get_required(id)?;
                    let status = checker.check(&citation).await;
                    EnrichedCitation::new(citation, status)
                }
                None => {
                    let enricher = Enricher::from_config(&config, &registry)?;
                    enricher.enrich_one(citation).await
                }
            };

            output_citations(std::slice::from_ref(&enriched), cli.output)?;
        }

        Some(Commands::Sources) => {
            let registry = CheckerRegistry::from_config(&config)?;
            let enricher = Enricher::from_config(&config, &registry)?;
            print_sources(&registry, &enricher);
        }

        Some(Commands::Config { ref command }) => match command {
            ConfigCommands::Init { path, force } => {
                let path = path.clone().unwrap_or_else(default_config_path);
                if path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                save_config(&Config::default(), &path)?;
                println!("Wrote default configuration to {}", path.display());
            }
            ConfigCommands::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        },

        None => {
            // No command provided - show help
            println!("No command provided. Use --help for usage information.");
            println!("Common commands:");
            println!("  enrich <file>                     - Resolve statuses for a citation file");
            println!("  check -t <type> -n <number>       - Resolve a single citation");
            println!("  sources                           - List checkers and routing");
            println!("  config init                       - Write a default config file");
        }
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn output_citations(citations: &[EnrichedCitation], format: OutputFormat) -> Result<()> {
    let actual_format = if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    };

    match actual_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(citations)?);
        }
        OutputFormat::Plain => {
            for enriched in citations {
                println!("{}: {}", enriched.citation.key(), enriched.status);
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Тип документа", "Номер", "Дата", "Статус"]);

            for enriched in citations {
                let citation = &enriched.citation;
                table.add_row(vec![
                    Cell::new(truncate(&citation.doc_type, 50)),
                    Cell::new(truncate(&citation.number, 30)),
                    Cell::new(citation.date.clone().unwrap_or_default()),
                    Cell::new(enriched.status.label()).add_attribute(Attribute::Bold),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Auto => unreachable!(),
    }

    Ok(())
}

fn print_failures(failures: &[BatchFailure]) {
    if failures.is_empty() {
        eprintln!("No citations were dropped.");
        return;
    }

    eprintln!("Dropped {} citation(s):", failures.len());
    for failure in failures {
        eprintln!("  {}: {}", failure.citation.key(), failure.error);
    }
}

fn print_sources(registry: &CheckerRegistry, enricher: &Enricher) {
    use comfy_table::{Cell, Table};

    let mut checkers = Table::new();
    checkers.load_preset(comfy_table::presets::UTF8_FULL);
    checkers.set_header(vec!["ID", "Name", "Capabilities"]);
    for checker in registry.all() {
        let capabilities = checker
            .capabilities()
            .iter_names()
            .map(|(name, _)| name)
            .collect::<Vec<_>>()
            .join(", ");
        checkers.add_row(vec![
            Cell::new(checker.id()),
            Cell::new(checker.name()),
            Cell::new(capabilities),
        ]);
    }
    println!("{checkers}");

    let ids = |chain: &normdoc_status::enrich::Chain| {
        chain
            .iter()
            .map(|c| c.id().to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    };

    let policy = enricher.policy();
    let mut routes = Table::new();
    routes.load_preset(comfy_table::presets::UTF8_FULL);
    routes.set_header(vec!["Document type contains", "Checkers"]);
    for route in policy.routes() {
        routes.add_row(vec![Cell::new(&route.pattern), Cell::new(ids(&route.chain))]);
    }
    routes.add_row(vec![Cell::new("(anything else)"), Cell::new(ids(policy.default_chain()))]);
    println!("{routes}");
    println!("Max concurrent lookups: {}", enricher.max_concurrent());
}
