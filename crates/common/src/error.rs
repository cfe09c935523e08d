//! Unified error type for the SMHI poller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Forecast decode error: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Parameter '{wire}' missing from snapshot valid at {valid_time}")]
    MissingWireKey { wire: String, valid_time: String },
}
