use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the stderr subscriber used by the binaries. `RUST_LOG` overrides
/// `level`.
pub fn setup_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.parse()?)
        .from_env_lossy();

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
