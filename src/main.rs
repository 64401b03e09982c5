use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use feedwatch::config::Config;
use feedwatch::feed::discover_feed_url;
use feedwatch::notify::{ConsoleNotifier, Notifier, NullNotifier};
use feedwatch::storage::Database;
use feedwatch::sync::{sync_all, sync_website, SyncMode, SyncOptions, SyncOutcome};

/// Get the config directory path (~/.config/feedwatch/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedwatch"))
}

#[derive(Parser, Debug)]
#[command(name = "feedwatch", about = "Incremental RSS/Atom ingestion for tracked websites")]
struct Args {
    /// Path to config file (defaults to ~/.config/feedwatch/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Suppress sync summary notices
    #[arg(long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Track a website and discover its feed URL
    Add {
        /// Display name for the site
        name: String,
        /// The site's human-facing URL
        url: String,
    },
    /// Re-run feed URL discovery for a tracked site
    Discover {
        /// Site name as given to `add`
        name: String,
    },
    /// Sync tracked sites (all of them, or one with --site)
    Sync {
        /// Sync only this site
        #[arg(long)]
        site: Option<String>,
        /// Use the latest-N fetch mode instead of month-scoped
        #[arg(long)]
        latest: bool,
    },
    /// List tracked sites and their stored entry counts
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| config_dir.join("feedwatch.db").display().to_string());
    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {db_path}"))?;

    let client = reqwest::Client::new();
    let notifier: Box<dyn Notifier> = if args.quiet || !config.notifications {
        Box::new(NullNotifier)
    } else {
        Box::new(ConsoleNotifier)
    };

    let opts = SyncOptions {
        mode: SyncMode::Month,
        feed_max_count: config.feed_max_count,
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    };

    match args.command {
        Command::Add { name, url } => {
            let id = db.insert_website(&name, &url).await?;
            println!("Tracking {name} ({url})");
            match discover_feed_url(&client, &url, opts.request_timeout).await {
                Ok(feed_url) => {
                    db.set_feed_url(id, &feed_url).await?;
                    println!("Feed URL: {feed_url}");
                }
                Err(e) => {
                    tracing::warn!(site = %name, error = %e, "Feed discovery failed");
                    eprintln!("Could not discover a feed URL ({e}); run `feedwatch discover {name}` later");
                }
            }
        }
        Command::Discover { name } => {
            let website = db
                .get_website_by_name(&name)
                .await?
                .with_context(|| format!("No tracked site named {name:?}"))?;
            let feed_url = discover_feed_url(&client, &website.url, opts.request_timeout)
                .await
                .context("Feed discovery failed")?;
            db.set_feed_url(website.id, &feed_url).await?;
            println!("Feed URL for {name}: {feed_url}");
        }
        Command::Sync { site, latest } => {
            let opts = SyncOptions {
                mode: if latest { SyncMode::Latest } else { SyncMode::Month },
                ..opts
            };
            match site {
                Some(name) => {
                    let website = db
                        .get_website_by_name(&name)
                        .await?
                        .with_context(|| format!("No tracked site named {name:?}"))?;
                    let outcome =
                        sync_website(&db, &client, notifier.as_ref(), &website, &opts).await?;
                    if let SyncOutcome::Synced(n) = outcome {
                        tracing::info!(site = %name, entries = n, "Sync complete");
                    }
                }
                None => {
                    let results = sync_all(&db, &client, notifier.as_ref(), &opts).await?;
                    let failures = results.iter().filter(|r| r.result.is_err()).count();
                    if failures > 0 {
                        eprintln!("{failures} site(s) failed to sync; see log for details");
                    }
                }
            }
        }
        Command::List => {
            for website in db.get_websites().await? {
                let entries = db.entries_for_website(website.id).await?;
                let feed = website.feed_url.as_deref().unwrap_or("(no feed URL)");
                let mark = website
                    .updated_at
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}  {}  feed: {}  entries: {}  last sync: {}",
                    website.name,
                    website.url,
                    feed,
                    entries.len(),
                    mark
                );
            }
        }
    }

    Ok(())
}
