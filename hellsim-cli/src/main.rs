mod reports;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stderr, stdout};
use std::path::{Path, PathBuf};

use hellsim_engine::{ArmyInfo, Batch, BatchEvent, BatchOptions, BatchSummary, SimConfig};
use reports::{BatchReport, write_console_report, write_info, write_json_report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored results block
    Console,
    /// Machine-readable summary
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "hellsim", version)]
#[command(about = "Monte Carlo simulator for the hell blood war - runs seeded trial batches")]
struct Args {
    /// JSON configuration file; defaults apply to absent fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of trials to run
    #[arg(long, default_value_t = 10)]
    trials: u64,

    /// Worker tasks (defaults to the available parallelism)
    #[arg(long)]
    threads: Option<usize>,

    /// Batch seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the army ratings for the configuration and exit
    #[arg(long)]
    info: bool,

    /// Include the detailed statistics section
    #[arg(long)]
    extended: bool,

    /// Include the per-trial log (console) or raw aggregate (json)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    if args.info {
        return write_info_output(&args, &ArmyInfo::from_config(&config));
    }

    let summary = run_batch(&args, config.clone()).await?;
    write_reports(&args, &config, &summary)
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config = SimConfig::from_json(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            log::info!("loaded configuration from {}", path.display());
            config
        }
        None => SimConfig::default(),
    };
    config.finalize().context("invalid configuration")
}

fn batch_options(args: &Args) -> BatchOptions {
    let mut options = BatchOptions::default();
    if let Some(threads) = args.threads {
        options = options.with_threads(threads);
    }
    if let Some(seed) = args.seed {
        options = options.with_seed(seed);
    }
    options
}

async fn run_batch(args: &Args, config: SimConfig) -> Result<BatchSummary> {
    if args.trials == 0 {
        bail!("--trials must be at least 1");
    }
    let mut handle = Batch::start(config, args.trials, batch_options(args))
        .context("failed to start the batch")?;

    let token = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", "Stopping after the current slice...".yellow());
            token.cancel();
        }
    });

    let show_progress = args.report == ReportFormat::Console;
    while let Some(event) = handle.next_event().await {
        match event {
            BatchEvent::Progress { percent } => {
                if show_progress {
                    eprint!("\rSimulating... {percent:>3}%");
                    let _ = stderr().flush();
                }
            }
            BatchEvent::Finished(summary) => {
                if show_progress {
                    eprintln!();
                }
                return Ok(summary);
            }
        }
    }
    bail!("the batch ended without a summary")
}

fn write_info_output(args: &Args, info: &ArmyInfo) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(output_target.writer(), info)?;
            writeln!(output_target.writer())?;
        }
        ReportFormat::Console => write_info(output_target.writer(), info)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

fn write_reports(args: &Args, config: &SimConfig, summary: &BatchSummary) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let report = BatchReport::new(config, summary);

    match args.report {
        ReportFormat::Json => {
            let stats = args.verbose.then_some(&summary.stats);
            write_json_report(output_target.writer(), &report, stats)?;
        }
        ReportFormat::Console => {
            if args.verbose {
                write!(output_target.writer(), "{}", summary.stats.log)?;
            }
            write_console_report(output_target.writer(), config, &report, args.extended)?;
            writeln!(
                output_target.writer(),
                "🏁 {} trials in {:.2?} (seed {})",
                summary.trials_merged(),
                summary.elapsed,
                summary.seed
            )?;
        }
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}
