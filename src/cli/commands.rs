use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ALL_CATEGORIES;
use crate::services::release_service::DEFAULT_PRERELEASE_COUNT;

#[derive(Parser)]
#[command(name = "podfeed")]
#[command(about = "Podcast episode aggregator with an RSS relay and cross-site session sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every source once and print the merged episode list
    Fetch {
        /// Feed category to draw RSS feeds from (see `feeds`)
        #[arg(short, long, default_value = ALL_CATEGORIES)]
        category: String,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Only show episodes published within the live window
        #[arg(long)]
        live_only: bool,
    },

    /// Keep refreshing on the configured interval; press Enter to refresh now
    Watch {
        /// Feed category to draw RSS feeds from
        #[arg(short, long, default_value = ALL_CATEGORIES)]
        category: String,
    },

    /// List the feed catalog and categories
    Feeds,

    /// Export the feed catalog to OPML format
    ExportFeeds {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the RSS relay and session sync endpoint
    Relay {
        /// Address to bind (overrides PODFEED_RELAY_ADDR)
        #[arg(long)]
        addr: Option<SocketAddr>,
    },

    /// Move the next titles into pre-release on the backend
    Prerelease {
        /// Number of titles to pre-release
        #[arg(long, default_value_t = DEFAULT_PRERELEASE_COUNT)]
        count: u32,
    },

    /// Promote the best-performing pre-release title to production
    SelectWinner,

    /// Broadcast a session to every sibling site
    SyncSession {
        /// JSON file holding the session; omit to broadcast a sign-out
        path: Option<PathBuf>,
    },
}
