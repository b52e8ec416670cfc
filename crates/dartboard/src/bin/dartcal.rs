//! dartcal: calibrate a dartboard camera view from detector keypoints and
//! score dart tips.

use clap::{ArgAction, Parser, Subcommand};
use dartboard::run::{calibrate_config, score_report};
use dartboard::Point2;
use log::LevelFilter;
use std::path::PathBuf;
use std::process::ExitCode;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "dartcal")]
#[command(about = "Dartboard calibration from keypoint detections, and dart scoring")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit structured JSON logs (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate from a JSON config and write a JSON report.
    Calibrate {
        /// Calibration config (detections, board radii, parameters).
        config: PathBuf,

        /// Fix the RANSAC sampling seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Report path; overrides `output_path` from the config.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the score zone of each pixel-space tip, one per line.
    Score {
        /// Report written by `dartcal calibrate`.
        report: PathBuf,

        /// Tip positions as `x,y` in pixels.
        #[arg(required = true, value_parser = parse_point, allow_hyphen_values = true)]
        tips: Vec<Point2<f64>>,
    },
}

fn parse_point(raw: &str) -> Result<Point2<f64>, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got {raw:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("bad coordinate {v:?}: {e}"))
    };
    Ok(Point2::new(parse(x)?, parse(y)?))
}

fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    #[cfg(feature = "tracing")]
    if json || std::env::var_os("RUST_LOG").is_some() {
        dartboard::core::init_tracing(json);
        return;
    }
    #[cfg(not(feature = "tracing"))]
    if json {
        eprintln!("--json-logs needs the `tracing` feature; using plain logs");
    }

    if verbose == 0 {
        let _ = dartboard::core::init_from_env(level);
    } else {
        let _ = dartboard::core::init_with_level(level);
    }
}

fn run(cli: Cli) -> CliResult<bool> {
    match cli.command {
        Commands::Calibrate { config, seed, out } => {
            let run = calibrate_config(&config, seed, out.as_deref())?;
            match (&run.report.result, &run.report.error) {
                (Some(res), _) => println!(
                    "calibrated: {} inliers, bull at ({:.2}, {:.2}) -> {}",
                    res.confidence,
                    res.center.x,
                    res.center.y,
                    run.output_path.display()
                ),
                (None, err) => {
                    eprintln!(
                        "calibration failed: {} -> {}",
                        err.as_deref().unwrap_or("unknown error"),
                        run.output_path.display()
                    );
                    return Ok(false);
                }
            }
        }
        Commands::Score { report, tips } => {
            for zone in score_report(&report, &tips)? {
                println!("{zone}");
            }
        }
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
