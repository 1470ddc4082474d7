use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. Fails if one is already set, so
/// callers that may run after another init can ignore the result.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|e| anyhow::anyhow!("set tracing subscriber: {e}"))?;

    Ok(())
}
