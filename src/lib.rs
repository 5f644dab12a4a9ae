pub mod core;
pub mod handler;
pub mod pricing;
pub mod providers;

pub use crate::core::config;
pub use handler::{GatewayResponse, ResponseEnvelope, handle_event, handle_event_with_config};

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info};

/// Runs a single gateway invocation for `event`, reading provider settings
/// from `config_path` or the default config location.
pub async fn invoke(event: &Value, config_path: Option<&str>) -> Result<GatewayResponse> {
    info!("Stock gateway invoked");

    let config = match config_path {
        Some(path) => config::GatewayConfig::load_from_path(path)?,
        None => config::GatewayConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    Ok(handle_event_with_config(&config, event).await)
}
