//! Purpose: Opt-in tracing bootstrap for binaries and test harnesses.
//! Exports: `init_tracing`.
//! Role: One-line subscriber setup; the library itself only emits events.
//! Invariants: Safe to call more than once; later calls are no-ops.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
