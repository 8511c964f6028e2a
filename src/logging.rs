use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. Filter comes from `RUST_LOG`, default `info`.
///
/// Fails if a global subscriber is already set; callers usually ignore that with `.ok()`.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("init tracing subscriber: {e}"))
}
