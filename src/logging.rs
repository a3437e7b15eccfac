//
// logging.rs
// Medprep-rs
//
// Installs the tracing subscriber used by the binary; RUST_LOG overrides the default `info` level.
//
// Thales Matheus Mendonça Santos - November 2025

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    // A second init (e.g. from tests driving the CLI) must not panic.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
