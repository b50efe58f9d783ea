//! `xref verify`: config-driven cross-source verification.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use log::debug;
use serde::Serialize;

use crossref_recon::{
    cancel_token, needs_alert, render_report, string_similarity, summarize, BatchSummary,
    EngineConfig, FixtureProvider, MemoryRecordStore, Orchestrator, VerificationResult, Verifier,
};

use crate::CliError;

#[derive(Subcommand)]
pub enum VerifyCommands {
    /// Verify a batch of records against pre-fetched observations
    #[command(after_help = "\
Examples:
  xref verify run engine.toml --records records.json --observations obs.json
  xref verify run engine.toml --records records.json --observations obs.json --json
  xref verify run engine.toml --records records.json --observations obs.json --ids b1,b7 --report
  xref verify run engine.toml --records records.json --observations obs.json --output result.json")]
    Run {
        /// Path to the engine .toml config
        config: PathBuf,

        /// JSON array of authoritative records
        #[arg(long)]
        records: PathBuf,

        /// JSON object mapping entity id to its observations
        #[arg(long)]
        observations: PathBuf,

        /// Only verify these entity ids (default: every record, in file order)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the plain-text report (to stderr when --json is set)
        #[arg(long)]
        report: bool,

        /// Override batch.workers from the config
        #[arg(long, env = "XREF_WORKERS")]
        workers: Option<usize>,

        /// Override batch.inter_entity_delay_ms from the config
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Validate an engine config without running
    #[command(after_help = "\
Examples:
  xref verify validate engine.toml")]
    Validate {
        /// Path to the engine .toml config
        config: PathBuf,
    },

    /// Print the case-insensitive similarity of two strings
    #[command(after_help = "\
Examples:
  xref verify similarity \"Limassol\" \"Limassol, CY\"")]
    Similarity {
        a: String,
        b: String,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_verify(cmd: VerifyCommands) -> Result<(), CliError> {
    match cmd {
        VerifyCommands::Run {
            config,
            records,
            observations,
            ids,
            json,
            output,
            report,
            workers,
            delay_ms,
        } => cmd_verify_run(RunArgs {
            config,
            records,
            observations,
            ids,
            json,
            output,
            report,
            workers,
            delay_ms,
        }),
        VerifyCommands::Validate { config } => cmd_verify_validate(config),
        VerifyCommands::Similarity { a, b, json } => cmd_verify_similarity(&a, &b, json),
    }
}

struct RunArgs {
    config: PathBuf,
    records: PathBuf,
    observations: PathBuf,
    ids: Vec<String>,
    json: bool,
    output: Option<PathBuf>,
    report: bool,
    workers: Option<usize>,
    delay_ms: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunMeta {
    config_name: String,
    engine_version: String,
    run_at: String,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    meta: RunMeta,
    results: &'a [VerificationResult],
    summary: BatchSummary,
}

fn read_file(path: &Path, what: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {what} {}: {e}", path.display())))
}

fn load_config(path: &Path) -> Result<EngineConfig, CliError> {
    let config_str = read_file(path, "config")?;
    EngineConfig::from_toml(&config_str).map_err(CliError::recon)
}

fn cmd_verify_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;

    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(CliError::args("--workers must be at least 1"));
        }
        config.batch.workers = workers;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.batch.inter_entity_delay_ms = delay_ms;
    }

    let store = MemoryRecordStore::from_json(&read_file(&args.records, "records")?)
        .map_err(CliError::recon)?;
    let provider = FixtureProvider::from_json(&read_file(&args.observations, "observations")?)
        .map_err(CliError::recon)?;

    let ids = if args.ids.is_empty() { store.ids() } else { args.ids };
    if ids.is_empty() {
        return Err(CliError::parse(format!("no records in {}", args.records.display()))
            .with_hint("records file must be a non-empty JSON array"));
    }
    debug!("verifying {} entities with config '{}'", ids.len(), config.name);

    let config_name = config.name.clone();
    let verifier = Verifier::new(config).map_err(CliError::recon)?;
    let orchestrator = Orchestrator::new(verifier, store, provider);
    let results = orchestrator.verify_many(&ids, &cancel_token());
    let summary = summarize(&results);
    let alerts = &orchestrator.verifier().config().alerts;
    let escalations = results.iter().filter(|r| needs_alert(r, alerts)).count();

    let out = RunOutput {
        meta: RunMeta {
            config_name: config_name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        results: &results,
        summary: summary.clone(),
    };

    // Output
    let json_str = serde_json::to_string_pretty(&out)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    if args.report {
        let report = render_report(&results, alerts);
        if args.json {
            eprint!("{report}");
        } else {
            print!("{report}");
        }
    }

    // Human summary to stderr
    eprintln!(
        "verify '{}': {} entities, {} verified, {} with discrepancies, {} failed ({} discrepancies, mean confidence {:.3}, {} need escalation)",
        config_name,
        summary.total_entities,
        summary.verified,
        summary.with_discrepancies,
        summary.failed,
        summary.total_discrepancies,
        summary.average_confidence,
        escalations,
    );

    Ok(())
}

fn cmd_verify_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let critical = config.fields.iter().filter(|f| f.critical).count();
    eprintln!(
        "valid: '{}' with {} field(s) ({} critical), {} worker(s)",
        config.name,
        config.fields.len(),
        critical,
        config.batch.workers,
    );
    Ok(())
}

fn cmd_verify_similarity(a: &str, b: &str, json: bool) -> Result<(), CliError> {
    let similarity = string_similarity(a, b);
    if json {
        let val = serde_json::json!({ "a": a, "b": b, "similarity": similarity });
        println!("{val}");
    } else {
        println!("{similarity:.4}");
    }
    Ok(())
}
