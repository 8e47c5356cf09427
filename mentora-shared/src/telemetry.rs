use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn is_production() -> bool {
    std::env::var("MENTORA_ENV").is_ok_and(|v| v == "production")
}

/// Install the global subscriber: compact human-readable output during
/// development, JSON lines in production. The filter comes from
/// `RUST_LOG` when set, otherwise info everywhere with debug for the
/// named crate.
pub fn init_tracing(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{service_name}=debug")));

    let registry = tracing_subscriber::registry().with(env_filter);

    if is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_line_number(true),
            )
            .init();
    }

    tracing::info!(service = service_name, "tracing initialized");
}
