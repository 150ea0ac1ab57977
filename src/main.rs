//! Application entry point — run the configured filter pipeline over a text.
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Initialise logging.
//! 3. Load [`PipelineConfig`] from `--config` or the platform config dir
//!    (returns default on first run).
//! 4. Build the [`FilterPipeline`]; broken filters are logged and skipped.
//! 5. Read the text from FILE or stdin, convert it, print the result.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use speech_filters::config::PipelineConfig;
use speech_filters::{FilterPipeline, TalkerDescriptor};

/// Turn raw text into speakable, sentence-split utterances
#[derive(Parser)]
#[command(name = "speech-filters", version, about)]
struct Cli {
    /// Pipeline configuration (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Talker language code, e.g. "en" or "en_US"
    #[arg(short, long, default_value = "en")]
    lang: String,

    /// Application id used for filter gating
    #[arg(long, default_value = "")]
    app_id: String,

    /// Print one sentence per line instead of tab-separated
    #[arg(long)]
    lines: bool,

    /// Do not run sentence-boundary detectors
    #[arg(long)]
    no_sbd: bool,

    /// Input file; stdin when omitted
    file: Option<PathBuf>,
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("cannot read stdin")?;
            Ok(text)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let loaded = match &cli.config {
        Some(path) => PipelineConfig::load_from(path),
        None => PipelineConfig::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        PipelineConfig::default()
    });

    let pipeline = FilterPipeline::from_config(&config);
    pipeline.set_skip_sbd(cli.no_sbd);

    let text = read_input(cli.file.as_ref())?;
    let talker = TalkerDescriptor::new(&cli.lang);
    let output = pipeline.convert(&text, &talker, &cli.app_id);
    log::debug!(
        "{} → {} ({})",
        talker,
        pipeline.state().label(),
        if pipeline.was_modified() { "modified" } else { "unchanged" }
    );

    if cli.lines {
        for sentence in output.split('\t') {
            println!("{sentence}");
        }
    } else {
        println!("{output}");
    }
    Ok(())
}
