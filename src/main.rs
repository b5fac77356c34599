//! `clinical-research` command line interface.
//!
//! Builds one [`ResearchEngine`] at startup and exposes each engine operation
//! as a subcommand. Results are printed to stdout as JSON envelopes; logs go
//! to stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clinical_research_engine::engine::{
    require_found, validate_medications, validate_query, ResearchResponse,
};
use clinical_research_engine::knowledge::PatientContext;
use clinical_research_engine::{
    AggregateResult, ComprehensiveRequest, Config, ConfigOverrides, LogFormat, ResearchEngine,
    SortMode,
};

#[derive(Debug, Parser)]
#[command(name = "clinical-research", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/clinical-research/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `clinical_research_engine=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format: pretty or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Per-branch deadline for comprehensive research
    #[arg(long, global = true)]
    branch_timeout_secs: Option<u64>,

    /// NCBI E-utilities API key
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search the literature index
    Literature {
        query: String,
        #[arg(short, long)]
        limit: Option<u32>,
        /// relevance, date or citation
        #[arg(short, long, default_value = "relevance")]
        sort: SortMode,
    },
    /// Search the clinical trial registry
    Trials {
        condition: String,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Diagnostic criteria for a condition
    Criteria { condition: String },
    /// Treatment guidelines for a condition
    Guidelines {
        condition: String,
        /// Patient context as a JSON object
        #[arg(long, value_parser = parse_json)]
        patient_context: Option<PatientContext>,
    },
    /// Pairwise drug interaction check
    Interactions {
        #[arg(required = true, num_args = 1..)]
        medications: Vec<String>,
    },
    /// ICD-10 code for a condition
    Icd10 { condition: String },
    /// Clinical calculators relevant to a condition
    Calculators {
        condition: String,
        /// Patient data as a JSON object
        #[arg(long, value_parser = parse_json)]
        patient_data: Option<PatientContext>,
    },
    /// Query every source concurrently and merge the answers
    Research {
        query: String,
        /// Medication to check for interactions; repeat for each drug
        #[arg(short, long = "medication")]
        medications: Vec<String>,
        #[arg(long, value_parser = parse_json)]
        patient_context: Option<PatientContext>,
    },
    /// Probe the upstream sources
    Health,
    /// Print the effective configuration as TOML
    Config,
    /// Print the JSON schema of the comprehensive research result
    Schema,
}

impl Cli {
    /// Command-line values that take precedence over every config layer
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            log_level: self.log_level.clone(),
            log_format: self.log_format,
            branch_timeout_secs: self.branch_timeout_secs,
            literature_api_key: self.api_key.clone(),
        }
    }
}

fn parse_json(raw: &str) -> Result<PatientContext, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}

fn init_logging(config: &Config) {
    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    config.apply_overrides(&cli.overrides());
    config.validate().context("invalid configuration")?;

    init_logging(&config);

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Schema => print_json(&schemars::schema_for!(AggregateResult)),
        command => {
            let engine = ResearchEngine::from_config(config)?;
            run(&engine, command).await
        }
    }
}

async fn run(engine: &ResearchEngine, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Literature { query, limit, sort } => {
            let query = validate_query("query", &query)?;
            let items = engine.search_literature(query, limit, sort).await?;
            print_json(&ResearchResponse::list(items))
        }
        Command::Trials { condition, limit } => {
            let condition = validate_query("condition", &condition)?;
            let trials = engine.search_trials(condition, limit).await?;
            print_json(&ResearchResponse::list(trials))
        }
        Command::Criteria { condition } => {
            let condition = validate_query("condition", &condition)?;
            let criteria = require_found(
                engine.diagnostic_criteria(condition).await?,
                "Diagnostic criteria",
                condition,
            )?;
            print_json(&ResearchResponse::single(criteria))
        }
        Command::Guidelines {
            condition,
            patient_context,
        } => {
            let condition = validate_query("condition", &condition)?;
            let guideline = require_found(
                engine
                    .treatment_guidelines(condition, patient_context.as_ref())
                    .await?,
                "Treatment guidelines",
                condition,
            )?;
            print_json(&ResearchResponse::single(guideline))
        }
        Command::Interactions { medications } => {
            validate_medications(&medications)?;
            print_json(&ResearchResponse::list(
                engine.check_interactions(&medications),
            ))
        }
        Command::Icd10 { condition } => {
            let condition = validate_query("condition", &condition)?;
            let entry = require_found(engine.icd10(condition).await?, "ICD-10 code", condition)?;
            print_json(&ResearchResponse::single(entry))
        }
        Command::Calculators {
            condition,
            patient_data,
        } => {
            let condition = validate_query("condition", &condition)?;
            let calculators = engine.calculators(condition, patient_data.as_ref()).await?;
            print_json(&ResearchResponse::list(calculators))
        }
        Command::Research {
            query,
            medications,
            patient_context,
        } => {
            let query = validate_query("query", &query)?;
            if !medications.is_empty() {
                validate_medications(&medications)?;
            }

            let mut request = ComprehensiveRequest::new(query).with_medications(medications);
            if let Some(context) = patient_context {
                request = request.with_patient_context(context);
            }

            // Ctrl-C abandons the request and stops in-flight branches
            let token = CancellationToken::new();
            let ctrl_c = {
                let token = token.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupted, cancelling research request");
                        token.cancel();
                    }
                })
            };

            let result = engine
                .comprehensive_research_with_cancellation(&request, &token)
                .await;
            ctrl_c.abort();

            print_json(&ResearchResponse::single(result?))
        }
        Command::Health => {
            let health = engine.health_check().await;
            let healthy = health.values().all(|ok| *ok);
            info!("Health check finished, all sources healthy: {}", healthy);
            print_json(&ResearchResponse::single(health))
        }
        Command::Config | Command::Schema => Ok(()),
    }
}
