use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use playlist_album_regroup as lib;
use std::path::PathBuf;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use lib::api::spotify::SpotifyCatalog;
use lib::api::Catalog;
use lib::config::Config;
use lib::error::RegroupError;

#[derive(Parser)]
#[command(name = "playlist-album-regroup", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize Spotify and store tokens in DB (interactive)
    Auth,
    /// Rebuild a playlist grouped by album and print the track list
    Show {
        /// Playlist share link (https://open.spotify.com/playlist/...)
        reference: String,
    },
    /// Rebuild a playlist grouped by album and print one share link per track
    Links {
        /// Playlist share link
        reference: String,
    },
    /// Rebuild a playlist grouped by album and create it as "<name> (Albums)"
    Create {
        /// Playlist share link
        reference: String,
    },
    /// Validate config file and exit
    ConfigValidate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Resolve config path: explicit --config overrides; otherwise use the
    // per-user config file when present and built-in defaults when not.
    let cfg = match &cli.config {
        Some(p) => Config::from_path(p)
            .with_context(|| format!("loading config from {}", p.display()))?,
        None => {
            let default_path = Config::default_path();
            if default_path.exists() {
                Config::from_path(&default_path)
                    .with_context(|| format!("loading config from {}", default_path.display()))?
            } else {
                Config::default()
            }
        }
    };

    // Initialize log->tracing bridge and structured logging.
    // Logs go to both stdout and a daily-rotated file in cfg.log_dir.
    let _ = LogTracer::init();
    let _ = std::fs::create_dir_all(&cfg.log_dir);
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&cfg.log_dir, "playlist-album-regroup.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    match cli.command {
        Commands::Auth => {
            lib::api::spotify_auth::run_spotify_auth(&cfg).await?;
        }
        Commands::Show { reference } => {
            let catalog = open_catalog(&cfg);
            match lib::regroup::regroup_from_reference(&catalog, &reference).await {
                Ok(playlist) => {
                    println!("{} ({} tracks):", playlist.name, playlist.tracks.len());
                    for track in &playlist.tracks {
                        println!("{} by {}", track.title, track.artist);
                    }
                }
                Err(e) => exit_for(e),
            }
        }
        Commands::Links { reference } => {
            let catalog = open_catalog(&cfg);
            match lib::regroup::regroup_from_reference(&catalog, &reference).await {
                Ok(playlist) => {
                    for link in lib::links::track_links(&playlist.tracks) {
                        println!("{}", link);
                    }
                }
                Err(e) => exit_for(e),
            }
        }
        Commands::Create { reference } => {
            let catalog = open_catalog(&cfg);
            let playlist = match lib::regroup::regroup_from_reference(&catalog, &reference).await {
                Ok(p) => p,
                Err(e) => exit_for(e),
            };
            match lib::materialize::materialize(
                &catalog,
                &playlist.tracks,
                &playlist.name,
                cfg.max_batch_size,
            )
            .await
            {
                Ok(playlist_id) => {
                    println!(
                        "Created playlist '{} (Albums)' with {} tracks: https://open.spotify.com/playlist/{}",
                        playlist.name,
                        playlist.tracks.len(),
                        playlist_id
                    );
                }
                Err(e) => exit_for(e),
            }
        }
        Commands::ConfigValidate => {
            let path = cli.config.unwrap_or_else(Config::default_path);
            match Config::from_path(&path) {
                Ok(_) => println!("OK"),
                Err(e) => {
                    eprintln!("Config validation failed: {}", e);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}

/// Build the Spotify catalog handle from stored credentials, or exit with a
/// hint to run `auth` first.
fn open_catalog(cfg: &Config) -> SpotifyCatalog {
    let catalog = SpotifyCatalog::new(String::new(), String::new(), cfg.db_path.clone());
    if !catalog.is_authenticated() {
        eprintln!("No stored Spotify credentials. Run `playlist-album-regroup auth` first.");
        std::process::exit(1);
    }
    catalog
}

/// Render a regroup failure and exit with a kind-specific status.
fn exit_for(err: RegroupError) -> ! {
    match &err {
        RegroupError::InvalidReference(_) => {
            eprintln!("{}", err);
            eprintln!("Expected a playlist link like https://open.spotify.com/playlist/<id>");
            std::process::exit(2);
        }
        RegroupError::Fetch(_) | RegroupError::Materialize(_) => {
            eprintln!("{:#}", anyhow::Error::new(err));
            std::process::exit(1);
        }
    }
}
