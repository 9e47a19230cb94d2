//! FileDock client wiring: configuration, logging and the signed-in
//! [`Workspace`](workspace::Workspace) the command-line front end drives.

pub mod config;
pub mod workspace;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,filedock=debug")),
        )
        .with_writer(std::io::stderr)
        .init();
}
