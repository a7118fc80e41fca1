use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber on stderr so stdout stays free for
/// query output. `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if result.is_ok() {
        tracing::debug!("logging initialized (default level {})", default_level);
    }
}
