use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use segchain::report::Report;
use segchain::{detect, AllocBudget, ChainBuilder, ChainParams, SegchainError};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "segchain")]
#[command(about = "Segment an image and find straight-line chains of segments")]
struct Cli {
    /// Input image (gray or color, 8 or 16 bits).
    image: PathBuf,
    /// Largest difference between linked neighbor pixels (0: equality).
    #[arg(long, default_value_t = 0.0)]
    threshold: f64,
    /// JSON file overriding chain parameters.
    #[arg(long)]
    params: Option<PathBuf>,
    /// Comma separated segment indices to report.
    #[arg(long, value_delimiter = ',')]
    select: Vec<usize>,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

fn load_params(path: Option<&PathBuf>) -> Result<ChainParams, SegchainError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(ChainParams::default()),
    }
}

fn run(cli: &Cli) -> Result<(), SegchainError> {
    let params = load_params(cli.params.as_ref())?;
    log::debug!("chain parameters: {params:?}");

    let img = detect::open_image(&cli.image)?;
    let budget = AllocBudget::unlimited();
    let seg = Arc::new(detect::segment_image(&img, cli.threshold, &budget)?);
    let pool = ChainBuilder::new(params).with_budget(&budget).build(&seg)?;
    log::info!(
        "{}: {} segments, {} chains (peak scratch {} bytes)",
        cli.image.display(),
        seg.len(),
        pool.len(),
        budget.peak()
    );

    let mut report = Report::new(&pool)?;
    if !cli.select.is_empty() {
        report = report.with_selection(&seg, &cli.select)?;
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}

/// `RUST_LOG` drives the filter when tracing is enabled.
#[cfg(feature = "tracing")]
fn init_logging(_level: LevelFilter) {
    segchain::core::init_tracing(false);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter) {
    let _ = segchain::core::init_with_level(level);
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.into());
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
