use std::str::FromStr;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `level` when set. A bare level gets quieter defaults for
/// the HTTP stack so RPC chatter does not drown the harness output.
pub fn init(level: &str, json: bool) {
    let spec = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        let level = level.trim();
        if level.contains(',') || level.contains('=') {
            level.to_string()
        } else {
            format!("{level},hyper=info,hyper_util=info,reqwest=info,alloy_transport_http=info")
        }
    });
    let filter = EnvFilter::from_str(&spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let res = if json {
        registry
            .with(fmt::layer().json().with_target(false).with_current_span(false))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true).compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
