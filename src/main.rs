//! Command-line front end for subreddit-dl

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use subreddit_dl::config::{ContentFilter, NsfwPolicy, OrientationFilter};
use subreddit_dl::{Config, RunSummary, SortMode, Timeframe, run_pipeline, run_until_signal};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Download images and videos from one or more subreddits
#[derive(Parser, Debug)]
#[command(name = "subreddit-dl", version, about, long_about = None)]
struct Cli {
    /// Subreddits to download from (with or without the r/ prefix)
    subreddits: Vec<String>,

    /// Load settings from a JSON file; flags given on the command line override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listing sort order: hot, new, top, rising, controversial
    #[arg(short, long)]
    sort: Option<SortMode>,

    /// Time window for top/controversial: hour, day, week, month, year, all
    #[arg(short, long)]
    timeframe: Option<Timeframe>,

    /// Number of files to save (failures count toward it)
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Download directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save each subreddit into its own sub-directory
    #[arg(long)]
    subreddit_dirs: bool,

    /// Minimum width in pixels
    #[arg(long)]
    min_width: Option<u32>,

    /// Minimum height in pixels
    #[arg(long)]
    min_height: Option<u32>,

    /// Orientation: any, landscape, portrait, square
    #[arg(long)]
    orientation: Option<OrientationFilter>,

    /// Content type: any, image, video, text
    #[arg(long)]
    content: Option<ContentFilter>,

    /// NSFW posts: allow, deny, only
    #[arg(long)]
    nsfw: Option<NsfwPolicy>,

    /// Skip posts whose title matches this regular expression (repeatable)
    #[arg(long = "exclude-title", value_name = "REGEX")]
    title_exclude: Vec<String>,

    /// Skip posts older than this many hours
    #[arg(long, value_name = "HOURS")]
    max_age_hours: Option<u64>,

    /// Concurrent downloads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Posts requested per listing page (at most 100)
    #[arg(long)]
    page_size: Option<u32>,

    /// Delay between listing pages of one subreddit, in milliseconds
    #[arg(long, value_name = "MS")]
    page_delay_ms: Option<u64>,

    /// Do not log progress lines
    #[arg(long)]
    no_progress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Build the run configuration, starting from the config file if one was given
    fn into_config(self) -> subreddit_dl::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if !self.subreddits.is_empty() {
            config.listing.subreddits = self.subreddits;
        }
        if let Some(sort) = self.sort {
            config.listing.sort = sort;
        }
        if let Some(timeframe) = self.timeframe {
            config.listing.timeframe = timeframe;
        }
        if let Some(page_size) = self.page_size {
            config.listing.page_size = page_size;
        }
        if let Some(ms) = self.page_delay_ms {
            config.listing.page_delay = Duration::from_millis(ms);
        }

        if let Some(min_width) = self.min_width {
            config.filters.min_width = min_width;
        }
        if let Some(min_height) = self.min_height {
            config.filters.min_height = min_height;
        }
        if let Some(orientation) = self.orientation {
            config.filters.orientation = orientation;
        }
        if let Some(content) = self.content {
            config.filters.content = content;
        }
        if let Some(nsfw) = self.nsfw {
            config.filters.nsfw = nsfw;
        }
        if !self.title_exclude.is_empty() {
            config.filters.title_exclude = self.title_exclude;
        }
        if let Some(hours) = self.max_age_hours {
            config.filters.max_age = Some(Duration::from_secs(hours.saturating_mul(3600)));
        }

        if let Some(count) = self.count {
            config.download.target_count = count;
        }
        if let Some(output) = self.output {
            config.download.download_dir = output;
        }
        if self.subreddit_dirs {
            config.download.subreddit_dirs = true;
        }
        if let Some(workers) = self.workers {
            config.download.workers = workers;
        }
        if self.no_progress {
            config.show_progress = false;
        }

        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "subreddit_dl=debug"
    } else {
        "subreddit_dl=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Saved {} file(s), {} failed, {} skipped in {:.1}s ({})",
        summary.saved,
        summary.failed,
        summary.skipped,
        summary.elapsed.as_secs_f64(),
        summary.stop_reason
    );
    if !summary.errors.is_empty() {
        println!("{} error(s):", summary.errors.len());
        for error in &summary.errors {
            println!("  - {}", error);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    let handle = match run_pipeline(config, CancellationToken::new()).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    // Item-level failures are reported in the summary, not through the exit code
    match run_until_signal(handle).await {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
