use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tagsort_rs::catalog::CatalogMatcher;
use tagsort_rs::common::{exit_code, initialize_logging};
use tagsort_rs::config::Config;
use tagsort_rs::listing::render_summary;
use tagsort_rs::musicbrainz::MusicBrainzClient;

/// Look up every folder of MP3 files in the MusicBrainz CD-stub catalog.
#[derive(Parser, Debug)]
#[command(name = "cdmatch", version)]
struct Args {
    /// Search root, may be given several times
    #[arg(short = 'p', long = "path", required = true)]
    paths: Vec<PathBuf>,

    /// Discard stored matches and query again
    #[arg(short = 'r', long)]
    refresh: bool,

    /// Minimum interval between catalog queries in milliseconds
    #[arg(long = "pt", value_name = "MS")]
    pacing_ms: Option<u64>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cdmatch: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::parse(args.config.as_deref())?;
    let _guard = initialize_logging(&config.log_output)?;

    let pacing = args.pacing_ms.map(Duration::from_millis).unwrap_or(config.catalog.pacing);
    let client = MusicBrainzClient::new(&config.catalog.base_url, &config.catalog.user_agent);
    let matcher = CatalogMatcher::new(client, pacing, config.catalog.max_retries);

    let report = matcher.run(&args.paths, args.refresh)?;

    println!("{}", render_summary(&report.summary));
    for folder in &report.unresolved {
        eprintln!("unresolved {}: {}", folder.path.display(), folder.reason);
    }
    Ok(())
}
