//! SceneSync demo driver.
//!
//! Runs a headless update loop against a manifest: edit the manifest while
//! it runs and watch assets attach and detach.
//!
//! ```bash
//! scenesync --manifest assets/scene.manifest --upload-threads 2 --frames 600
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use scenesync::{
    HostUploadDevice, OperationThread, SceneGroup, SyncConfig, SyncCoordinator, UploadPool,
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Keeps a headless scene in sync with a manifest of asset files.
#[derive(Parser, Debug)]
#[command(name = "scenesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Manifest to watch (overrides the config file)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Upload contexts to create (overrides the config file)
    #[arg(short, long)]
    upload_threads: Option<usize>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to run before exiting
    #[arg(short, long, default_value = "600")]
    frames: u64,

    /// Frame duration in milliseconds
    #[arg(long, default_value = "16")]
    frame_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    if let Some(manifest) = cli.manifest {
        config.manifest_path = manifest;
    }
    if let Some(threads) = cli.upload_threads {
        config.upload_threads = threads;
    }
    config.validate()?;

    run(&config, cli.frames, Duration::from_millis(cli.frame_ms))?;
    Ok(())
}

fn run(config: &SyncConfig, frames: u64, frame: Duration) -> scenesync::Result<()> {
    let pool = Arc::new(UploadPool::with_contexts(config.upload_threads, |_| {
        HostUploadDevice::new()
    })?);
    let coordinator = SyncCoordinator::from_config(config, Arc::clone(&pool));
    let merger = coordinator.merger();

    let mut scene = SceneGroup::new();
    if config.open_on_start {
        coordinator.open(&mut scene);
    }

    let mut operation = OperationThread::spawn(coordinator)?;

    for frame_index in 0..frames {
        let report = merger.merge(&mut scene);
        if !report.is_empty() {
            tracing::info!(
                frame = frame_index,
                live = ?scene.ids(),
                "scene updated"
            );
        }
        thread::sleep(frame);
    }

    operation.stop();
    pool.shutdown();

    tracing::info!(stats = ?merger.stats(), nodes = scene.len(), "done");
    Ok(())
}
