use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber for applications embedding the overlay.
/// With `debug` this crate's spans are raised to `debug` and `RUST_LOG`
/// may override the whole filter; otherwise `info` is pinned so a stray
/// environment variable cannot make an end-user build verbose. Safe to
/// call more than once.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(concat!("info,", env!("CARGO_PKG_NAME"), "=debug")))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
