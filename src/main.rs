use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use session_sync::{PeerOrigins, Session, SessionBroadcaster};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use podfeed::cli::{Cli, Commands};
use podfeed::config::Config;
use podfeed::domain::{Episode, CATEGORIES};
use podfeed::normalize::{format_duration, time_ago};
use podfeed::relay::{self, RelayState};
use podfeed::services::{
    AggregateOptions, AggregateService, FeedBoard, FeedCatalog, RefreshService, ReleaseService,
};
use podfeed::sources::{HttpFetch, ReqwestFetcher, SourceRegistry};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_json = std::env::var("PODFEED_LOG_JSON")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("loading configuration")?;

    match cli.command {
        Commands::Fetch {
            category,
            json,
            live_only,
        } => cmd_fetch(&config, &category, json, live_only).await,
        Commands::Watch { category } => cmd_watch(&config, &category).await,
        Commands::Feeds => cmd_feeds(&config),
        Commands::ExportFeeds { output } => cmd_export_feeds(&config, output),
        Commands::Relay { addr } => cmd_relay(&config, addr).await,
        Commands::Prerelease { count } => cmd_prerelease(&config, count).await,
        Commands::SelectWinner => cmd_select_winner(&config).await,
        Commands::SyncSession { path } => cmd_sync_session(&config, path).await,
    }
}

fn fetcher(config: &Config) -> anyhow::Result<Arc<dyn HttpFetch>> {
    let fetcher = ReqwestFetcher::new(config.source_timeout).context("building HTTP client")?;
    Ok(Arc::new(fetcher))
}

fn aggregate_service(config: &Config, category: &str) -> anyhow::Result<AggregateService> {
    let catalog = FeedCatalog::load(config).context("loading feed catalog")?;
    let feeds = catalog.select(category, config.max_feeds)?;
    let registry = SourceRegistry::from_config(config, &feeds, fetcher(config)?);

    Ok(AggregateService::new(
        registry,
        AggregateOptions::from_config(config),
    ))
}

fn print_episode(episode: &Episode) {
    let now = Utc::now();
    let rank = episode
        .trending_rank()
        .map(|r| format!("#{} ", r))
        .unwrap_or_default();
    let live = if episode.is_live() { " [LIVE]" } else { "" };

    println!("  {}{}{} ({})", rank, episode.title, live, episode.source_label);
    println!(
        "    {} | {} | {}",
        episode.display_author(),
        time_ago(episode.published_at, now),
        format_duration(episode.duration_seconds)
    );
    if !episode.is_playable() {
        if let Some(link) = &episode.external_url {
            println!("    Listen: {}", link);
        }
    }
}

fn print_board(board: &FeedBoard, json: bool, live_only: bool) -> anyhow::Result<()> {
    let snapshot = board.snapshot();

    if let Some(warning) = &snapshot.warning {
        eprintln!("Warning: {}", warning);
    }

    let Some(latest) = snapshot.latest else {
        println!("No results yet.");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&*latest)?);
        return Ok(());
    }

    let counts = latest.counts();
    println!(
        "{} episodes ({} live): rss {}, apple {}, youtube {}, trending {}, backend {}\n",
        counts.total,
        counts.live,
        counts.rss,
        counts.apple,
        counts.youtube,
        counts.trending,
        counts.backend
    );

    let episodes = if live_only { &latest.live } else { &latest.flat };
    if episodes.is_empty() {
        println!("No episodes to show.");
    }
    for episode in episodes {
        print_episode(episode);
    }

    let failed = latest.failed_sources();
    if !failed.is_empty() {
        println!();
        for outcome in failed {
            println!("  ! {} ({}): {:?}", outcome.label, outcome.kind, outcome.status);
        }
    }

    Ok(())
}

async fn cmd_fetch(
    config: &Config,
    category: &str,
    json: bool,
    live_only: bool,
) -> anyhow::Result<()> {
    let service = aggregate_service(config, category)?;
    let board = FeedBoard::new();

    board.publish(service.aggregate().await);
    print_board(&board, json, live_only)
}

async fn cmd_watch(config: &Config, category: &str) -> anyhow::Result<()> {
    let service = aggregate_service(config, category)?;
    let board = Arc::new(FeedBoard::new());
    let mut updates = board.subscribe();

    let refresh = RefreshService::new(Arc::new(service), board.clone(), config.refresh_interval);
    let handle = refresh.spawn();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    println!(
        "Refreshing every {} minutes. Press Enter to refresh now, Ctrl-C to quit.\n",
        config.refresh_interval.as_secs() / 60
    );

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_board(&board, false, false)?;
                println!();
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(_) => {
                        println!("Refreshing...");
                        handle.refresh_now();
                    }
                    // detached from a terminal; keep refreshing on the timer
                    None => stdin_open = false,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.stop();
    Ok(())
}

fn cmd_feeds(config: &Config) -> anyhow::Result<()> {
    let catalog = FeedCatalog::load(config)?;

    if catalog.feeds().is_empty() {
        println!("No feeds configured.");
        return Ok(());
    }

    for category in CATEGORIES.iter().skip(1) {
        let feeds: Vec<_> = catalog
            .feeds()
            .iter()
            .filter(|f| f.category == category.id)
            .collect();
        if feeds.is_empty() {
            continue;
        }

        println!("{} [{}]", category.label, category.id);
        for feed in feeds {
            println!("  {}", feed.name);
            println!("    URL: {}", feed.url);
            if !feed.description.is_empty() {
                println!("    {}", feed.description);
            }
        }
        println!();
    }

    println!("{} feeds", catalog.feeds().len());
    Ok(())
}

fn cmd_export_feeds(config: &Config, output: Option<PathBuf>) -> anyhow::Result<()> {
    let opml = FeedCatalog::load(config)?.to_opml()?;

    match output {
        Some(path) => {
            fs::write(&path, &opml).with_context(|| format!("writing {}", path.display()))?;
            println!("Exported feeds to {}", path.display());
        }
        None => {
            println!("{}", opml);
        }
    }

    Ok(())
}

async fn cmd_relay(config: &Config, addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let state = RelayState::new(fetcher(config)?, PeerOrigins::all_known());
    relay::serve(addr.unwrap_or(config.relay_addr), state).await?;
    Ok(())
}

async fn cmd_prerelease(config: &Config, count: u32) -> anyhow::Result<()> {
    let service = ReleaseService::from_config(config, fetcher(config)?)?;
    let reply = service.prerelease(count).await?;

    println!("Pre-released {} titles.", count);
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

async fn cmd_select_winner(config: &Config) -> anyhow::Result<()> {
    let service = ReleaseService::from_config(config, fetcher(config)?)?;
    let winner = service.select_winner().await?;

    println!("Selected winner: {}", winner.as_deref().unwrap_or("Unknown"));
    Ok(())
}

async fn cmd_sync_session(config: &Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let session: Option<Session> = match path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            Some(serde_json::from_str(&content).context("parsing session")?)
        }
        None => None,
    };

    let broadcaster = SessionBroadcaster::new(&config.site_origin)?;
    let report = broadcaster.broadcast(session.as_ref()).await;

    println!(
        "Session {} delivered to {}/{} sites.",
        if session.is_some() { "sync" } else { "sign-out" },
        report.delivered,
        report.attempted
    );
    Ok(())
}
