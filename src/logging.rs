//! Structured logging setup (§10.2): `tracing` + `tracing-subscriber` with
//! an `EnvFilter` defaulting to `info`, overridable via `RUST_LOG`. Replaces
//! this codebase's prior ad hoc `eprintln!` warnings with leveled,
//! component-scoped spans.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
