//! mgba-glue: headless host for the mGBA WebAssembly core.
//!
//! Loads a core, optionally fetches a ROM into its virtual filesystem, runs a
//! number of frames while replaying a sensor log, and can write the resulting
//! save state to disk.

mod config;
mod replay;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use mgba_glue::{Adapter, ModuleSource};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{Config, Overrides};
use replay::Replay;

/// mgba-glue: headless host for the mGBA WebAssembly core
#[derive(Parser)]
#[command(name = "mgba-glue", version, about)]
struct Cli {
    /// Core module (.wasm or .wat)
    core: Option<PathBuf>,

    /// ROM URL (http(s):// or file://)
    #[arg(short, long)]
    rom: Option<String>,

    /// Filename for the ROM under /roms
    #[arg(long)]
    rom_name: Option<String>,

    /// Host directory backing the core's filesystem
    #[arg(long)]
    fs_root: Option<PathBuf>,

    /// Number of frames to run
    #[arg(short = 'n', long)]
    frames: Option<u32>,

    /// JSON-lines sensor log to replay
    #[arg(long)]
    sensor_log: Option<PathBuf>,

    /// Write the serialized state here after the run
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            core: self.core.clone(),
            rom: self.rom.clone(),
            rom_name: self.rom_name.clone(),
            fs_root: self.fs_root.clone(),
            frames: self.frames,
            sensor_log: self.sensor_log.clone(),
            save_state: self.save_state.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "mgba_glue=debug"
    } else {
        "mgba_glue=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{}", failure_message(&e));
        std::process::exit(1);
    }
}

/// The single line a fatal error is reported with.
fn failure_message(e: &anyhow::Error) -> String {
    format!("mgba-glue: {e:#}")
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    cfg.apply(cli.overrides());

    let core_path = cfg
        .core
        .clone()
        .context("no core module given (positional argument or `core` in the config file)")?;
    let core = std::fs::read(&core_path)
        .with_context(|| format!("failed to read core at {}", core_path.display()))?;

    let mut adapter_cfg = cfg.adapter.clone();
    if cfg.rom.is_some() && adapter_cfg.fs_root.is_none() {
        let root = std::env::temp_dir().join("mgba-glue");
        info!(root = %root.display(), "no filesystem root configured; using a temporary one");
        adapter_cfg.fs_root = Some(root);
    }

    let mut adapter = Adapter::new(adapter_cfg)?;
    adapter
        .init_module(ModuleSource::Buffer(core))
        .await
        .with_context(|| format!("failed to initialize {}", core_path.display()))?;
    adapter.retro_init()?;

    if let Some(url) = &cfg.rom {
        let loaded = adapter
            .load_rom(url, cfg.rom_name.as_deref())
            .await
            .with_context(|| format!("failed to load ROM from {url}"))?;
        if loaded.accepted == Some(false) {
            bail!("core rejected ROM {}", loaded.path);
        }
    }

    let mut replay = match &cfg.sensor_log {
        Some(path) => {
            let mut replay = Replay::load(path)?;
            adapter.bind_sensors(&mut replay);
            Some(replay)
        }
        None => None,
    };

    for frame in 0..cfg.frames {
        if let Some(replay) = replay.as_mut() {
            replay.emit_until(frame);
        }
        adapter
            .run_frame()
            .with_context(|| format!("frame {frame} failed"))?;
    }
    info!(frames = cfg.frames, "run complete");
    if let Some(replay) = &replay {
        if replay.remaining() > 0 {
            warn!(
                remaining = replay.remaining(),
                "sensor log has events past the last frame"
            );
        }
    }

    if let Some(path) = &cfg.save_state {
        match adapter.save_state()? {
            Some(state) => {
                std::fs::write(path, &state)
                    .with_context(|| format!("failed to write state to {}", path.display()))?;
                info!(path = %path.display(), len = state.len(), "state saved");
            }
            None => warn!("core cannot serialize its state; nothing written"),
        }
    }

    adapter.unload_game()?;
    adapter.retro_deinit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_one_line_with_context_chain() {
        let err = anyhow::anyhow!("HTTP status 404").context("failed to load ROM from x");
        let message = failure_message(&err);
        assert_eq!(
            message,
            "mgba-glue: failed to load ROM from x: HTTP status 404"
        );
        assert_eq!(message.lines().count(), 1);
    }
}
