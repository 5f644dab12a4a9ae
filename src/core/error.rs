//! Error taxonomy for a gateway invocation
//!
//! Only [`GatewayError::Validation`] aborts an invocation. The other variants
//! are recovered per ticker and reported inside the response envelope.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed, missing or empty `tickers` input
    #[error("Invalid request format: {0}")]
    Validation(String),

    /// The provider has no usable data for the symbol
    #[error("No valid data found for ticker '{0}'.")]
    TickerNotFound(String),

    /// Network failure, upstream block or malformed upstream payload
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn is_validation(&self) -> bool {
        matches!(self, GatewayError::Validation(_))
    }
}
