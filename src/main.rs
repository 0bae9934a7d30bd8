use anyhow::Context;
use procgrid::LoadedPayload;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Optional payload path; the demo catalog is used without one.
    let payload = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .map(|path| LoadedPayload::load_path(&path))
        .transpose()?;

    procgrid::run_gui(payload)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("running GUI")
}
