//! Print the column order and training-set means of a KOI training CSV.
//!
//! Run once after retraining; save the `--defaults-only` output as
//! `crates/feature-schema/resources/feature_defaults.json` or point the
//! API's `defaults_path` at it.

use anyhow::Context;
use clap::Parser;
use feature_means::{compute, DEFAULT_TARGET};
use std::fs::File;
use std::path::PathBuf;
use tracing::{warn, Level};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Training data file
    #[arg(short, long, default_value = "train.csv")]
    csv: PathBuf,

    /// Label column to drop before averaging
    #[arg(short, long, default_value = DEFAULT_TARGET)]
    target: String,

    /// Print only the optional-feature means as a defaults file
    #[arg(long)]
    defaults_only: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = File::open(&args.csv).with_context(|| {
        format!(
            "Make sure '{}' is in the working directory",
            args.csv.display()
        )
    })?;
    let means = compute(file, &args.target)
        .with_context(|| format!("Failed to read {}", args.csv.display()))?;

    if !means.target_found() {
        warn!("Target column '{}' not found; averaging every column", args.target);
    }
    if !means.matches_model_columns() {
        warn!("Column order differs from the deployed model's column table");
    }

    if args.defaults_only {
        println!("{}", means.defaults_json()?);
        return Ok(());
    }

    println!("--- Column order ---");
    println!("{}", serde_json::to_string(means.columns())?);
    println!();
    println!("--- Feature means ---");
    println!("{}", means.means_json()?);

    Ok(())
}
