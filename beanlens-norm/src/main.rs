//! beanlens-norm - Coffee bean attribute normalization
//!
//! Command-line front end for the normalization engine:
//! - `normalize`: extracted bean record(s) → normalized JSON
//! - `match`: individual raw values of one domain
//! - `validate`: dictionary consistency check
//! - `summarize`: unknown-queue log report
//! - `versions`: available dictionary versions
//!
//! Configuration priority: CLI arguments > `BEANLENS_*` environment > TOML file > defaults.

use anyhow::{bail, Context, Result};
use beanlens_common::config::{resolve_config, ConfigOverrides};
use beanlens_common::time::secs_to_duration;
use beanlens_common::FlavorNoteMode;
use beanlens_norm::dictionary::{validate_dictionary, DictionaryRepository};
use beanlens_norm::types::{BeanRecord, Domain};
use beanlens_norm::unknown_queue::summary::{self, DEFAULT_TOP};
use beanlens_norm::NormalizationEngine;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Extra time granted to webhook deliveries before the process exits
const FLUSH_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "beanlens-norm")]
#[command(about = "Normalize extracted coffee bean attributes against a curated dictionary")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Configuration file (default: ~/.config/beanlens/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dictionary version to load
    #[arg(long, global = true)]
    dictionary_version: Option<String>,

    /// Directory holding <version>/terms.json and <version>/aliases.json
    #[arg(long, global = true)]
    dictionary_dir: Option<PathBuf>,

    /// Minimum similarity for fuzzy matches
    #[arg(long, global = true)]
    fuzzy_threshold: Option<f64>,

    /// Flavor-note policy (strict or legacy)
    #[arg(long, global = true)]
    flavor_note_mode: Option<FlavorNoteMode>,

    /// Minimum similarity for strict-mode fuzzy flavor notes
    #[arg(long, global = true)]
    flavor_note_fuzzy_threshold: Option<f64>,

    /// JSON Lines file receiving unknown-queue events
    #[arg(long, global = true)]
    unknown_queue_path: Option<PathBuf>,

    /// Also report matches below this confidence
    #[arg(long, global = true)]
    unknown_min_confidence: Option<f64>,

    /// Webhook receiving unknown-queue events
    #[arg(long, global = true)]
    webhook_url: Option<String>,

    /// Shared secret sent to the webhook
    #[arg(long, global = true)]
    webhook_token: Option<String>,

    /// Webhook timeout in seconds
    #[arg(long, global = true)]
    webhook_timeout: Option<f64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,
}

impl GlobalArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            dictionary_version: self.dictionary_version.clone(),
            dictionary_dir: self.dictionary_dir.clone(),
            fuzzy_threshold: self.fuzzy_threshold,
            flavor_note_mode: self.flavor_note_mode,
            flavor_note_fuzzy_threshold: self.flavor_note_fuzzy_threshold,
            unknown_queue_path: self.unknown_queue_path.clone(),
            unknown_min_confidence: self.unknown_min_confidence,
            unknown_queue_webhook_url: self.webhook_url.clone(),
            unknown_queue_webhook_token: self.webhook_token.clone(),
            unknown_queue_webhook_timeout_secs: self.webhook_timeout,
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a bean record (JSON object) or a JSON array of records
    Normalize {
        /// Input file; stdin when omitted or "-"
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Normalize raw values of a single domain
    Match {
        /// process, variety, roast_level, country or flavor_note
        #[arg(short, long)]
        domain: Domain,

        /// Treat the values as one list (split and deduplicate)
        #[arg(long)]
        list: bool,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Raw values
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Check the configured dictionary for consistency problems
    Validate,

    /// Summarize an unknown-queue log
    Summarize {
        /// Unknown-queue JSONL file
        #[arg(short, long)]
        input: PathBuf,

        /// Number of rows to show
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = SummaryFormat::Table)]
        format: SummaryFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available dictionary versions
    Versions,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SummaryFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(cli.global.config.as_deref(), &cli.global.overrides())
        .context("Failed to resolve configuration")?;

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let normalization = config.normalization;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        dictionary_version = %normalization.dictionary_version,
        "beanlens-norm starting"
    );

    match cli.command {
        Command::Normalize { input, pretty } => {
            let text = read_input(input.as_deref())?;
            let engine = NormalizationEngine::new(normalization.clone())?;

            let value: serde_json::Value = serde_json::from_str(&text).context("Input is not valid JSON")?;
            let output = if value.is_array() {
                let records: Vec<BeanRecord> =
                    serde_json::from_value(value).context("Input array must contain bean records")?;
                let results: Vec<_> = records.iter().map(|r| engine.normalize_bean_info(r)).collect();
                serde_json::to_value(results)?
            } else {
                let record: BeanRecord = serde_json::from_value(value).context("Input is not a bean record")?;
                serde_json::to_value(engine.normalize_bean_info(&record))?
            };

            print_json(&output, pretty)?;
            flush(&engine, normalization.unknown_queue_webhook_timeout_secs);
        }

        Command::Match {
            domain,
            list,
            pretty,
            values,
        } => {
            let engine = NormalizationEngine::new(normalization.clone())?;
            let items = if list {
                engine.normalize_list(domain, &values)
            } else {
                values.iter().map(|v| engine.normalize_one(domain, v)).collect()
            };

            print_json(&serde_json::to_value(items)?, pretty)?;
            flush(&engine, normalization.unknown_queue_webhook_timeout_secs);
        }

        Command::Validate => {
            let repo = DictionaryRepository::from_config(&normalization)?;
            let issues = validate_dictionary(&repo);
            if issues.is_empty() {
                println!(
                    "dictionary {} OK ({} terms, {} aliases)",
                    repo.version(),
                    repo.term_count(),
                    repo.alias_count()
                );
            } else {
                for issue in &issues {
                    println!("{}", issue);
                }
                bail!("dictionary {} has {} issue(s)", repo.version(), issues.len());
            }
        }

        Command::Summarize {
            input,
            top,
            format,
            output,
        } => {
            let records = summary::load_records(&input)?;
            let rows = summary::summarize(&records);
            let rendered = match format {
                SummaryFormat::Table => summary::render_table(&rows, top),
                SummaryFormat::Json => summary::render_json(&rows, top)?,
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, format!("{}\n", rendered))
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), rows = rows.len().min(top), "Summary written");
                }
                None => println!("{}", rendered),
            }
        }

        Command::Versions => {
            for version in DictionaryRepository::available_versions(normalization.dictionary_dir.as_deref()) {
                println!("{}", version);
            }
        }
    }

    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

fn flush(engine: &NormalizationEngine, webhook_timeout_secs: f64) {
    let timeout = secs_to_duration(webhook_timeout_secs).saturating_add(FLUSH_GRACE);
    if !engine.flush_unknown_queue(timeout) {
        warn!("Some unknown-queue deliveries did not complete before exit");
    }
}
