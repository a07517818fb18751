use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. `RUST_LOG` directives take precedence
/// over the service defaults added here.
pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["anomaly_service=info", "consumption_client=info", "tower_http=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
