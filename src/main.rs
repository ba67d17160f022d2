use anyhow::{Context, Result};
use clap::Parser;
use nightglow::config::Config;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cfg = Config::parse();

    // Stdout belongs to the renderer, so logs only go to a file
    if let Some(path) = &cfg.log_file {
        init_logging(path)?;
    }
    if let Some(seed) = cfg.seed {
        fastrand::seed(seed);
    }

    nightglow::app::run(&cfg)
}
