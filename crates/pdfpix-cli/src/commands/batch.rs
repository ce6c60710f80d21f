//! Batch command - extract images from every PDF in a directory.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pdfpix_core::models::Profile;
use pdfpix_core::{Extractor, discover_inputs};

use super::options::ExtractOptions;
use super::output;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Directory with the PDF files (default: input.docs_dir from config)
    input_dir: Option<PathBuf>,

    #[command(flatten)]
    options: ExtractOptions,

    /// Keep going when a document fails to load
    #[arg(long)]
    continue_on_error: bool,
}

pub fn run(args: BatchArgs, config_path: Option<&str>, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = args.options.resolve(config_path, Profile::LineEstimate)?;
    let input_dir = args
        .input_dir
        .clone()
        .unwrap_or_else(|| config.input.docs_dir.clone());

    let files = discover_inputs(&input_dir, &config.input.extensions)?;

    if !quiet {
        println!(
            "{} Found {} files to process ({} profile)",
            style("ℹ").blue(),
            files.len(),
            config.profile
        );
    }

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let mut extractor = Extractor::new(&config);
    let result = extractor.run_with(&files, args.continue_on_error, |position, path| {
        pb.set_position(position as u64);
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
    });
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            return Err(anyhow::Error::new(e).context("Batch run aborted"));
        }
    };
    pb.set_position(files.len() as u64);
    pb.finish_with_message("Complete");

    info!("Done: {} images written", extractor.written());
    output::finish(&report, &args.options, start.elapsed())
}
