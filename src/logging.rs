//! Logging setup.
//!
//! The library only emits `tracing` events. Applications (and the demos)
//! call [`init`] once to print them.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber.
///
/// The filter comes from `SPARK_DOM_LOG`, then `RUST_LOG`, then
/// `spark_dom={level}`. Calling this twice is harmless; the second call
/// leaves the existing subscriber in place.
pub fn init(level: &str) {
    let filter = std::env::var("SPARK_DOM_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(format!("spark_dom={level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
