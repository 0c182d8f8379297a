//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Crawl artist discographies into an `artist/album/track` tree.
///
/// Every artist, album and track is recorded in a local database so an
/// interrupted run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "discography")]
#[command(author, version, about)]
pub struct Args {
    /// Artist names to crawl, in order
    #[arg(value_name = "ARTIST")]
    pub artists: Vec<String>,

    /// Read artist names from a file, one per line
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Root directory of the downloaded tree
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not write metadata tags
    #[arg(short = 't', long)]
    pub skip_tags: bool,

    /// Fetch tracks back to back without the randomized pause (ignored with --daemon)
    #[arg(short = 'D', long)]
    pub no_delay: bool,

    /// Fetch live albums too
    #[arg(short = 'l', long)]
    pub live: bool,

    /// Queue every artist directory found under the output directory
    #[arg(long)]
    pub rescan: bool,

    /// Only search and record artists; fetch nothing
    #[arg(long)]
    pub preload: bool,

    /// Print queue, throughput and status counts, then exit
    #[arg(long)]
    pub status: bool,

    /// Crawl every pending artist in the queue (always paced)
    #[arg(long)]
    pub daemon: bool,

    /// Maximum fetches this run (0 for no limit)
    #[arg(long, value_name = "N")]
    pub batch_limit: Option<u32>,

    /// Maximum fetches per calendar day (0 for no limit)
    #[arg(long, value_name = "N")]
    pub daily_limit: Option<u32>,

    /// Path to the state database
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Program printing catalog JSON for search/artist/album/playlist
    #[arg(long, value_name = "PROGRAM")]
    pub catalog_helper: Option<String>,

    /// Mark the current public address banned, then exit
    #[arg(long, conflicts_with = "rotate")]
    pub mark_banned: bool,

    /// Rotate the public address now, then exit
    #[arg(long)]
    pub rotate: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Default tracing filter for the verbosity flags.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
