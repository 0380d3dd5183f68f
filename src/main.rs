// PeaceFinder - Terminal Music Player
// Lists the songs in your music folders and plays them, nothing more

use anyhow::Result;
use clap::Parser;
use peacefinder::{
    audio::RodioEngine,
    config::Config,
    library::{check_read_access, FilesystemIndex},
    ui::{App, AppState},
    MusicPlayerManager,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "peacefinder")]
#[command(about = "A minimal terminal music player")]
struct Args {
    /// Also write logs to stderr
    #[arg(long)]
    dev: bool,

    /// Music directory to load instead of the configured ones (repeatable)
    #[arg(long = "music-dir", value_name = "DIR")]
    music_dirs: Vec<PathBuf>,

    /// Initial volume between 0.0 and 1.0
    #[arg(long)]
    volume: Option<f32>,
}

fn init_logging(log_dir: &Path, dev: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    // Daily rotating file appender; the terminal belongs to the UI
    let file_appender = tracing_appender::rolling::daily(log_dir, "peacefinder.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let base_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,peacefinder=debug"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false);
    let stderr_layer = dev.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(base_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load()?;
    if !args.music_dirs.is_empty() {
        config.music_directories = args.music_dirs;
    }
    if let Some(volume) = args.volume {
        config.audio.initial_volume = volume;
    }

    let _log_guard = init_logging(&config.log_directory, args.dev)?;
    info!("🎵 PeaceFinder starting up");

    // Permission gate: without read access the index is never queried
    let access = check_read_access(&config.music_directories);
    if let Err(e) = &access {
        error!("{}", e);
    }

    let engine = RodioEngine::new(config.audio.clone())?;
    let manager = MusicPlayerManager::new(engine, config.audio.initial_volume);
    let index = FilesystemIndex::new(config.music_directories.clone());
    let state = AppState::new(manager, Box::new(index), access, config.ui.clone());

    let mut app = App::new(state)?;
    app.run().await?;

    info!("PeaceFinder shut down");
    Ok(())
}
