//! Command line star type prediction against local artifacts.
//!
//! Subcommands:
//! - `single`: classify one star given on the command line
//! - `batch`: annotate every row of a CSV table with its predicted type

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use starclass::batch::{run_batch, run_batch_to_file, BatchSummary};
use starclass::pipeline::PredictionPipeline;
use starclass::record::StarRecord;
use starclass_server::ArtifactArgs;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "star_predict")]
#[command(about = "Predict star types from temperature, luminosity, radius, magnitude, color and spectral class")]
#[command(version)]
struct Args {
    #[command(flatten)]
    artifacts: ArtifactArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a single star (defaults describe the Sun)
    Single {
        /// Surface temperature in Kelvin (typically 1000 to 40000)
        #[arg(long, default_value = "5778")]
        temperature: f64,

        /// Luminosity relative to the Sun (typically up to 1e6)
        #[arg(long, default_value = "1.0")]
        luminosity: f64,

        /// Radius relative to the Sun (typically up to 1000)
        #[arg(long, default_value = "1.0")]
        radius: f64,

        /// Absolute visual magnitude (typically -10 to 20)
        #[arg(long, default_value = "4.83", allow_negative_numbers = true)]
        absolute_magnitude: f64,

        /// Star color, e.g. "Blue-white"
        #[arg(long, default_value = "Yellow")]
        color: String,

        /// Spectral class (O, B, A, F, G, K, M)
        #[arg(long, default_value = "G")]
        spectral_class: String,
    },

    /// Predict every row of a CSV file
    Batch {
        /// Input CSV with Temperature, L, R, A_M, Color and Spectral_Class columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV (standard output when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the run summary (counts and per-row failures) as JSON
        #[arg(long)]
        summary: Option<PathBuf>,
    },
}

fn predict_single(pipeline: &PredictionPipeline, record: StarRecord) -> Result<()> {
    for field in record.outside_advisory_ranges() {
        warn!("{} is outside its usual range; predicting anyway", field);
    }
    let prediction = pipeline
        .predict_one(&record)
        .context("Prediction failed")?;

    println!("Predicted star type: {}", prediction.star_type);
    for fallback in &prediction.fallbacks {
        println!(
            "  note: unknown {} {:?}, predicted as {:?}",
            fallback.field, fallback.observed, fallback.substituted
        );
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    eprintln!(
        "{} rows: {} predicted, {} failed, {} used a fallback category",
        summary.total_rows, summary.predicted, summary.failed, summary.fallback_rows
    );
    for failure in &summary.failures {
        eprintln!("  row {}: {}", failure.row, failure.error);
    }
}

fn write_summary(summary: &BatchSummary, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    info!("Wrote batch summary to {}", path.display());
    Ok(())
}

fn predict_batch(
    pipeline: &PredictionPipeline,
    input: &Path,
    output: Option<&Path>,
    summary_path: Option<&Path>,
) -> Result<()> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );

    let result = match output {
        Some(path) => run_batch_to_file(pipeline, reader, path),
        None => {
            let mut handle = io::stdout().lock();
            let result = run_batch(pipeline, reader, &mut handle);
            handle.flush()?;
            result
        }
    };

    let report = result.with_context(|| format!("Batch prediction of {} failed", input.display()))?;
    let summary = BatchSummary::from(&report);
    print_summary(&summary);
    if let Some(path) = output {
        info!("Wrote predictions to {}", path.display());
    }
    if let Some(path) = summary_path {
        write_summary(&summary, path)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let args = Args::parse();
    let pipeline = args.artifacts.load_pipeline()?;

    match args.command {
        Command::Single {
            temperature,
            luminosity,
            radius,
            absolute_magnitude,
            color,
            spectral_class,
        } => predict_single(
            &pipeline,
            StarRecord::new(
                temperature,
                luminosity,
                radius,
                absolute_magnitude,
                color,
                spectral_class,
            ),
        ),
        Command::Batch {
            input,
            output,
            summary,
        } => predict_batch(&pipeline, &input, output.as_deref(), summary.as_deref()),
    }
}
