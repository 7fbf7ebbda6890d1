//! Command line front end for trademark collision screening.
//!
//! Usage:
//!     markscreen screen "ACME" --class 9 --segment "Software"
//!     markscreen screen "ACME" --class 9 --registry-url http://127.0.0.1:8080 --format json
//!     markscreen health --registry-url http://127.0.0.1:8080

mod config;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::ScreenConfig;
use markscreen_explain::{draft_opinion, render_report, ReportContext};
use markscreen_features::{build_mark, ingest, PhoneticAlgorithm};
use markscreen_model::{Mark, NiceClass, RegistryQuery};
use markscreen_registry::{
    dedup_records, CsvRegistry, FallbackRegistry, HttpRegistry, HttpRegistryConfig,
    RegistrySource,
};
use markscreen_risk::{screen, RiskClassifier};
use markscreen_score::EditPhoneticScorer;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "markscreen")]
#[command(about = "Preliminary trademark collision screening")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a candidate mark against the registry
    Screen {
        /// Candidate mark text
        mark: String,

        /// Nice class of the candidate (e.g. "9" or "NCL(11) 9")
        #[arg(short, long)]
        class: String,

        /// Business segment, for the report header
        #[arg(short, long, default_value = "")]
        segment: String,

        /// CSV dataset of prior marks
        #[arg(long)]
        csv: Option<PathBuf>,

        /// HTTP registry URL (the CSV dataset becomes the fallback)
        #[arg(long)]
        registry_url: Option<String>,

        /// Phonetic algorithm (soundex, metaphone)
        #[arg(long)]
        phonetic: Option<PhoneticAlgorithm>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check HTTP registry health
    Health {
        /// HTTP registry URL
        #[arg(long)]
        registry_url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "markscreen=debug" } else { "markscreen=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.parse()?),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => ScreenConfig::load(path)?,
        None => ScreenConfig::default(),
    };

    match cli.command {
        Commands::Screen {
            mark,
            class,
            segment,
            csv,
            registry_url,
            phonetic,
            format,
        } => {
            if let Some(csv) = csv {
                config.registry.csv_path = csv;
            }
            if registry_url.is_some() {
                config.registry.http_url = registry_url;
            }
            if let Some(phonetic) = phonetic {
                config.phonetic.algorithm = phonetic;
            }
            run_screen(&config, &mark, &class, segment, format).await?;
        }
        Commands::Health { registry_url } => {
            let url = registry_url.or(config.registry.http_url.clone());
            run_health(&config, url).await?;
        }
    }

    Ok(())
}

fn http_registry(config: &ScreenConfig, base_url: String) -> Result<HttpRegistry> {
    Ok(HttpRegistry::new(HttpRegistryConfig {
        base_url,
        timeout_secs: config.registry.timeout_secs,
    })?)
}

async fn run_screen(
    config: &ScreenConfig,
    mark_text: &str,
    class_text: &str,
    business_segment: String,
    format: OutputFormat,
) -> Result<()> {
    if mark_text.trim().is_empty() {
        bail!("the candidate mark text is required");
    }

    let classifier = RiskClassifier::new(config.classifier)?;
    let nice_class = NiceClass::parse(class_text)?;
    let encoder = config.phonetic.algorithm.encoder();
    let candidate = build_mark(mark_text.trim(), nice_class, encoder.as_ref());

    let query = RegistryQuery::new(mark_text.trim(), nice_class).with_limit(config.registry.limit);
    let csv = CsvRegistry::new(&config.registry.csv_path);
    let (records, source_label) = match &config.registry.http_url {
        Some(url) => {
            FallbackRegistry::new(http_registry(config, url.clone())?, csv)
                .fetch_labeled(&query)
                .await?
        }
        None => (csv.fetch(&query).await?, csv.name()),
    };

    let records = dedup_records(records);
    let existing = records
        .iter()
        .map(|record| ingest(record, encoder.as_ref()))
        .collect::<Result<Vec<Mark>, _>>()?;

    tracing::info!(
        candidate = %candidate.raw_text(),
        class = %nice_class,
        source = source_label,
        compared = existing.len(),
        "Screening candidate mark"
    );

    let report = screen(&candidate, &existing, &EditPhoneticScorer, &classifier)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            let context = ReportContext {
                business_segment,
                source_label: source_label.to_string(),
                phonetic_algorithm: encoder.name().to_string(),
                date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            };
            println!("{}", render_report(&report, &context));
            println!();
            println!("{}", draft_opinion(&report, &context));
        }
    }

    Ok(())
}

async fn run_health(config: &ScreenConfig, registry_url: Option<String>) -> Result<()> {
    let Some(url) = registry_url else {
        bail!("no registry URL given (use --registry-url or [registry] http_url)");
    };
    let registry = http_registry(config, url.clone())?;

    print!("Checking registry at {}... ", url);
    match registry.health_check().await {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
