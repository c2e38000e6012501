use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use freshcheck_core::{AliasMode, AnalysisConfig, Analyzer, CallGraph};
use freshcheck_emit::{Emitter, EmitterConfig, OutputFormat, ReportEmitter, VerbosityLevel};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "freshcheck")]
#[command(about = "freshcheck - find reads of values whose sources changed after they were computed")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Check {
        trace: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        entry: Option<String>,

        #[arg(long)]
        fixpoint_alias: bool,

        #[arg(long)]
        no_color: bool,

        #[arg(long)]
        no_summaries: bool,

        #[arg(long)]
        deny_warnings: bool,

        #[arg(short, long)]
        verbose: bool,
    },

    Validate {
        trace: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },

    Order {
        trace: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

struct CheckOptions {
    trace: PathBuf,
    format: Format,
    config: Option<PathBuf>,
    entry: Option<String>,
    fixpoint_alias: bool,
    no_color: bool,
    no_summaries: bool,
    deny_warnings: bool,
    verbose: bool,
}

impl CheckOptions {
    fn format_is_text(&self) -> bool {
        matches!(self.format, Format::Text)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Check { verbose, .. } | Commands::Validate { verbose, .. } => *verbose,
        Commands::Order { .. } => false,
    };
    init_logging(verbose);

    let result = match cli.command {
        Commands::Check {
            trace,
            format,
            config,
            entry,
            fixpoint_alias,
            no_color,
            no_summaries,
            deny_warnings,
            verbose,
        } => cmd_check(CheckOptions {
            trace,
            format,
            config,
            entry,
            fixpoint_alias,
            no_color,
            no_summaries,
            deny_warnings,
            verbose,
        }),
        Commands::Validate { trace, verbose } => cmd_validate(&trace, verbose),
        Commands::Order { trace } => cmd_order(&trace),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(options: &CheckOptions) -> Result<AnalysisConfig> {
    let mut config = match &options.config {
        Some(path) => AnalysisConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(entry) = &options.entry {
        config = config.with_entry_point(entry.clone());
    }
    if options.fixpoint_alias {
        config = config.with_alias_mode(AliasMode::Fixpoint);
    }
    Ok(config)
}

fn cmd_check(options: CheckOptions) -> Result<bool> {
    let config = load_config(&options)?;
    debug!(?config, trace = %options.trace.display(), "checking trace");

    let unit = freshcheck_trace::parse_file(&options.trace)?;
    let report = Analyzer::new(config).analyze(&unit);

    let use_colors = !options.no_color && options.format_is_text();
    if !use_colors {
        colored::control::set_override(false);
    }
    let emitter_config = EmitterConfig {
        use_colors,
        verbosity: if options.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        },
        show_summaries: !options.no_summaries,
        ..EmitterConfig::default()
    };
    let emitter = ReportEmitter::new(emitter_config, options.format.into());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut context = emitter.context();
    emitter.emit(&report, &mut out, &mut context)?;
    out.flush()?;

    let failed = report.has_errors() || (options.deny_warnings && report.has_warnings());
    Ok(!failed)
}

fn cmd_validate(trace: &Path, verbose: bool) -> Result<bool> {
    use colored::*;

    let text = std::fs::read_to_string(trace)
        .with_context(|| format!("reading {}", trace.display()))?;

    match freshcheck_trace::parse_unit(&text) {
        Ok(unit) => {
            println!("{}", "VALID".bright_green().bold());
            if verbose {
                println!("  {} global step(s)", unit.globals.len());
                for function in &unit.functions {
                    println!("  fn {}: {} step(s)", function.name, function.body.len());
                }
            }
            Ok(true)
        }
        Err(e) => {
            println!("{}", "INVALID".bright_red().bold());
            println!("{}", e);
            Ok(false)
        }
    }
}

fn cmd_order(trace: &Path) -> Result<bool> {
    let unit = freshcheck_trace::parse_file(trace)?;
    let order = CallGraph::build(&unit).post_order();

    for function in &order.order {
        println!("{}", function);
    }
    for (caller, callee) in &order.back_edges {
        println!("recursive: {} -> {}", caller, callee);
    }
    Ok(true)
}
