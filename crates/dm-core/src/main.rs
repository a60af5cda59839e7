//! Dimorph - two-population dimorphism analysis
//!
//! The main entry point for dimorph, handling:
//! - Divergence ranking of measured variables
//! - Extreme-tail rules and subject classification
//! - Log-likelihood-ratio scoring
//! - Combined reports in JSON, CSV, Markdown or summary form

use clap::{Args, Parser, Subcommand};
use dm_common::error::format_error_human;
use dm_common::{Error, OutputFormat, Result, StructuredError};
use dm_config::resolve::{ENV_CONFIG_DIR, ENV_CONFIG_PATH};
use dm_config::{load_config, resolve_config_path, AnalysisConfig, ConfigSource};
use dm_core::exit_codes::ExitCode;
use dm_core::log_event;
use dm_core::logging::{
    config::{ENV_LOG, ENV_LOG_FORMAT},
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use dm_core::{Analysis, AnalysisReport, ScoreKind};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Dimorph - rank, threshold and score differences between two populations
#[derive(Parser)]
#[command(name = "dimorph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Analysis config file (TOML, or JSON by extension)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Data table, overriding the config's `data`
    #[arg(long, short = 'd', global = true)]
    data: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank variables by density divergence between the two groups
    Rank(RankArgs),

    /// Derive extreme-tail rules for the top variables
    Rules(SelectArgs),

    /// Classify subjects into zones on the top variables
    Classify(SelectArgs),

    /// Score subjects against both groups on every variable
    Score(ScoreArgs),

    /// Ranking, rules, zones and scores in one report
    Report(ReportArgs),

    /// Validate configuration and data without producing a report
    Check,

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct RankArgs {
    /// Show every variable instead of the top N
    #[arg(long)]
    all: bool,

    /// Number of variables to show
    #[arg(long, short = 'n')]
    top: Option<usize>,
}

#[derive(Args, Debug, Clone)]
struct SelectArgs {
    /// Number of top-ranked variables to use
    #[arg(long, short = 'n')]
    top: Option<usize>,

    /// Fraction of each group treated as its extreme tail, in (0, 0.5)
    #[arg(long, short = 't')]
    tail_fraction: Option<f64>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Report P(B | value) instead of the log-likelihood ratio
    #[arg(long)]
    posterior: bool,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[command(flatten)]
    select: SelectArgs,

    #[command(flatten)]
    score: ScoreArgs,
}

fn main() {
    let cli = Cli::parse();

    init_logging(&log_config(&cli.global));
    let ctx = LogContext::new(generate_run_id());

    let exit_code = match &cli.command {
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Clean
        }
        command => {
            log_event!(
                ctx,
                INFO,
                event_names::RUN_STARTED,
                Stage::Init,
                "starting dimorph"
            );
            match run_command(&cli.global, command, &ctx) {
                Ok(code) => {
                    log_event!(
                        ctx,
                        INFO,
                        event_names::RUN_FINISHED,
                        Stage::Report,
                        "run finished",
                        exit_code = code.as_i32()
                    );
                    code
                }
                Err(err) => output_error(&cli.global, &ctx, &err),
            }
        }
    };

    std::process::exit(exit_code.as_i32());
}

/// Logging follows `-v`/`-q` when given, then the environment, then warn.
///
/// Machine-readable stdout formats switch stderr logs to JSONL unless
/// `DIMORPH_LOG_FORMAT` says otherwise.
fn log_config(global: &GlobalOpts) -> LogConfig {
    let cli_level = (global.verbose > 0 || global.quiet)
        .then(|| LogLevel::from_verbosity(global.verbose, global.quiet));
    let cli_format = (std::env::var(ENV_LOG_FORMAT).is_err() && global.format.is_machine())
        .then_some(LogFormat::Jsonl);

    let mut config = LogConfig::from_env(cli_level, cli_format);
    if cli_level.is_none() && std::env::var(ENV_LOG).is_err() && std::env::var("RUST_LOG").is_err()
    {
        config.level = LogLevel::Warn;
    }
    config
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_command(global: &GlobalOpts, command: &Commands, ctx: &LogContext) -> Result<ExitCode> {
    let (config, source, path) = resolve_config(global, ctx)?;

    match command {
        Commands::Rank(args) => {
            if let Some(0) = args.top {
                return Err(Error::InvalidCount { value: 0 });
            }
            let limit = if args.all {
                None
            } else {
                Some(args.top.unwrap_or(config.selection.top_n))
            };
            let analysis = Analysis::load(config, ctx.clone())?;
            emit(global, &analysis.rank_report(limit))?;
            Ok(ExitCode::Clean)
        }
        Commands::Rules(args) => {
            let analysis = Analysis::load(apply_selection(config, args), ctx.clone())?;
            let selector = analysis.selector()?;
            emit(global, &analysis.rules_report(&selector))?;
            Ok(ExitCode::Clean)
        }
        Commands::Classify(args) => {
            let mut analysis = Analysis::load(apply_selection(config, args), ctx.clone())?;
            let selector = analysis.selector()?;
            let report = analysis.classify_report(&selector)?;
            emit(global, &report)?;
            Ok(if report.inconsistent_count() > 0 {
                ExitCode::Inconsistent
            } else {
                ExitCode::Clean
            })
        }
        Commands::Score(args) => {
            let analysis = Analysis::load(config, ctx.clone())?;
            emit(global, &analysis.score_report(score_kind(args))?)?;
            Ok(ExitCode::Clean)
        }
        Commands::Report(args) => {
            let mut analysis = Analysis::load(apply_selection(config, &args.select), ctx.clone())?;
            let selector = analysis.selector()?;
            let report = analysis.full_report(&selector, score_kind(&args.score))?;
            emit(global, &report)?;
            Ok(ExitCode::Clean)
        }
        Commands::Check => run_check(global, config, source, path, ctx),
        Commands::Version => Ok(ExitCode::Clean),
    }
}

/// Load the resolved config and apply global overrides.
fn resolve_config(
    global: &GlobalOpts,
    ctx: &LogContext,
) -> Result<(AnalysisConfig, ConfigSource, Option<PathBuf>)> {
    let (path, source) = resolve_config_path(global.config.as_deref());
    let mut config = match &path {
        Some(p) => {
            let config = load_config(p).map_err(|e| {
                log_event!(
                    ctx,
                    ERROR,
                    event_names::CONFIG_ERROR,
                    Stage::Init,
                    "config failed to load",
                    error = e.to_string()
                );
                Error::from(e)
            })?;
            log_event!(
                ctx,
                INFO,
                event_names::CONFIG_LOADED,
                Stage::Init,
                "config loaded",
                path = p.display().to_string(),
                source = source.to_string()
            );
            config
        }
        None => {
            log_event!(
                ctx,
                DEBUG,
                event_names::CONFIG_DEFAULT_USED,
                Stage::Init,
                "no config file, using defaults"
            );
            AnalysisConfig::default()
        }
    };
    if let Some(data) = &global.data {
        config.data = Some(data.clone());
    }
    Ok((config, source, path))
}

fn apply_selection(mut config: AnalysisConfig, args: &SelectArgs) -> AnalysisConfig {
    if let Some(top) = args.top {
        config = config.with_top_n(top);
    }
    if let Some(fraction) = args.tail_fraction {
        config = config.with_tail_fraction(fraction);
    }
    config
}

fn score_kind(args: &ScoreArgs) -> ScoreKind {
    if args.posterior {
        ScoreKind::Posterior
    } else {
        ScoreKind::LogLikelihoodRatio
    }
}

fn emit(global: &GlobalOpts, report: &AnalysisReport) -> Result<()> {
    let rendered = report.render(global.format)?;
    println!("{}", rendered.trim_end());
    Ok(())
}

fn run_check(
    global: &GlobalOpts,
    config: AnalysisConfig,
    source: ConfigSource,
    path: Option<PathBuf>,
    ctx: &LogContext,
) -> Result<ExitCode> {
    let analysis = Analysis::load(config, ctx.clone())?;
    let selector = analysis.selector()?;
    let dataset = analysis.dataset();

    let result = serde_json::json!({
        "status": "ok",
        "run_id": ctx.run_id,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "config": {
            "source": source.to_string(),
            "path": path.as_ref().map(|p| p.display().to_string()),
            "env": {
                ENV_CONFIG_PATH: std::env::var(ENV_CONFIG_PATH).ok(),
                ENV_CONFIG_DIR: std::env::var(ENV_CONFIG_DIR).ok(),
            },
        },
        "data": {
            "path": analysis.config().data.as_ref().map(|p| p.display().to_string()),
            "subjects": dataset.subjects.len(),
            "skipped_rows": dataset.skipped,
            "variables": dataset.variables.len(),
        },
        "selection": {
            "active": selector.active(),
            "tail_fraction": selector.tail_fraction().value(),
        },
    });

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => println!(
            "ok: {} subjects, {} variables, {} active (config: {})",
            dataset.subjects.len(),
            dataset.variables.len(),
            selector.active().len(),
            source
        ),
    }
    Ok(ExitCode::Clean)
}

fn print_version(global: &GlobalOpts) {
    let version_info = serde_json::json!({
        "dimorph_version": env!("CARGO_PKG_VERSION"),
        "config_schema_version": dm_config::CONFIG_SCHEMA_VERSION,
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });

    match global.format {
        OutputFormat::Json => println!("{}", version_info),
        _ => {
            println!("dimorph {}", env!("CARGO_PKG_VERSION"));
            println!("config schema version: {}", dm_config::CONFIG_SCHEMA_VERSION);
        }
    }
}

/// Report an error on stderr and pick the exit code.
fn output_error(global: &GlobalOpts, ctx: &LogContext, err: &Error) -> ExitCode {
    let exit_code = ExitCode::for_error(err);
    if exit_code.is_internal_error() {
        log_event!(
            ctx,
            ERROR,
            event_names::INTERNAL_ERROR,
            Stage::Report,
            "run failed",
            error = err.to_string()
        );
    }

    if global.format.is_machine() {
        let structured = StructuredError::from(err);
        let response = serde_json::json!({
            "run_id": ctx.run_id,
            "status": "error",
            "exit_code": exit_code.code_name(),
            "error": structured,
        });
        eprintln!("{}", response);
    } else {
        let use_color = !global.no_color && std::io::stderr().is_terminal();
        eprintln!("{}", format_error_human(err, use_color));
    }
    exit_code
}
