#![forbid(unsafe_code)]

//! Logging bootstrap for native hosts and demos.
//!
//! The runtime only emits `tracing` events; nothing is printed until a
//! subscriber is installed. [`init`] installs a plain fmt subscriber:
//!
//! ```ignore
//! warpgate_web::logging::init(warpgate_web::logging::DEFAULT_FILTER)?;
//! ```

use tracing_subscriber::EnvFilter;

/// Filter used when the host has no preference.
pub const DEFAULT_FILTER: &str = "warpgate_runtime=info,warpgate_web=info";

/// Error type of [`init`].
pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Install a global fmt subscriber filtered by `filter`.
///
/// `RUST_LOG`, when set, takes precedence. Fails if the filter does not
/// parse or a global subscriber is already installed.
pub fn init(filter: &str) -> Result<(), InitError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(env) => env,
        Err(_) => EnvFilter::try_new(filter)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}
