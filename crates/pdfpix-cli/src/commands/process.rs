//! Process command - extract images from a single PDF file.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pdfpix_core::models::{Profile, RunReport};
use pdfpix_core::{Extractor, PdfpixError};

use super::options::ExtractOptions;
use super::output;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    #[command(flatten)]
    options: ExtractOptions,
}

pub fn run(args: ProcessArgs, config_path: Option<&str>, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = args.options.resolve(config_path, Profile::HeadingPath)?;

    // Check input file exists
    if !args.input.is_file() {
        return Err(PdfpixError::InputMissing { path: args.input }.into());
    }

    info!("Processing file: {}", args.input.display());

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Extracting {}", args.input.display()));

    let mut extractor = Extractor::new(&config);
    extractor.prepare()?;
    let document = match extractor.extract_file(&args.input) {
        Ok(document) => document,
        Err(e) => {
            pb.abandon();
            return Err(e.into());
        }
    };
    pb.finish_with_message("Done");

    let mut report = RunReport::new(config.profile, config.output.images_dir.clone());
    report.documents.push(document);

    output::finish(&report, &args.options, start.elapsed())
}
