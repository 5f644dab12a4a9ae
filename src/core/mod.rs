//! Core business logic abstractions

pub mod config;
pub mod error;
pub mod log;
pub mod summary;

// Re-export main types for cleaner imports
pub use error::GatewayError;
pub use summary::{DividendEvent, RawSummary, SummaryProvider};
