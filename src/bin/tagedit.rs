use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tagsort_rs::common::{exit_code, initialize_logging};
use tagsort_rs::config::Config;
use tagsort_rs::directives::parse_directives;
use tagsort_rs::listing::render_file_tags;
use tagsort_rs::pipeline::{self, PipelineOptions};

/// Inspect MP3 tags, or edit copies of the files into an output tree.
#[derive(Parser, Debug)]
#[command(name = "tagedit", version)]
struct Args {
    /// Input file or directory
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output directory; without it the files are only listed
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// List every frame of every file
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Descend into subdirectories
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Keep only album, artist, title, track and picture frames
    #[arg(short = 'x', long = "remove-obsolete")]
    remove_obsolete: bool,

    /// TAG=VALUE to set, TAG= to delete, TAG=~OTHER to copy; applied left to right
    #[arg(short = 'u', long = "update", value_name = "TAG=VALUE")]
    updates: Vec<String>,

    /// Compute everything but write nothing
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tagedit: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::parse(args.config.as_deref())?;
    let _guard = initialize_logging(&config.log_output)?;
    let update_directives = parse_directives(&args.updates)?;

    let options = PipelineOptions {
        output_root: args.output,
        recursive: args.recursive,
        dry_run: args.dry_run,
        various_artists: false,
        remove_obsolete_tags: args.remove_obsolete,
        update_directives,
        write_resolved: false,
        verbose: args.verbose,
        rules: config.normalize,
        max_filename_bytes: config.max_filename_bytes,
    };
    let report = pipeline::run(&[args.input], &options)?;

    for file in &report.files {
        if args.verbose {
            let duration = file.duration_secs.map(|s| format!(" ({}:{:02})", s / 60, s % 60)).unwrap_or_default();
            println!("{}{}", file.display_name, duration);
            println!("{}\n", render_file_tags(file));
        } else {
            println!("{}", file.display_name);
        }
    }
    for skipped in &report.skipped {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    Ok(())
}
