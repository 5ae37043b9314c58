use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tagsort_rs::common::{exit_code, initialize_logging};
use tagsort_rs::config::Config;
use tagsort_rs::listing::render_resolutions;
use tagsort_rs::pipeline::{self, PipelineOptions};

/// Copy MP3 files into an output tree with normalized artist, album, title and track tags.
#[derive(Parser, Debug)]
#[command(name = "reorganize", version)]
struct Args {
    /// Input directory, may be given several times
    #[arg(short = 'i', long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory; without it the resolutions are only printed
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Compute everything but write nothing
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Treat every directory as a various-artists compilation
    #[arg(short = 'v', long = "various-artists")]
    various_artists: bool,

    /// Descend into subdirectories
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("reorganize: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::parse(args.config.as_deref())?;
    let _guard = initialize_logging(&config.log_output)?;

    let options = PipelineOptions {
        output_root: args.output,
        recursive: args.recursive,
        dry_run: args.dry_run,
        various_artists: args.various_artists,
        write_resolved: true,
        rules: config.normalize,
        max_filename_bytes: config.max_filename_bytes,
        ..Default::default()
    };
    let report = pipeline::run(&args.inputs, &options)?;

    println!("{}", render_resolutions(&report));
    for file in report.incomplete() {
        eprintln!("incomplete metadata, kept filename as title: {}", file.source.display());
    }
    for skipped in &report.skipped {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    Ok(())
}
