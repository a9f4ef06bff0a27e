//! Error types for the gateway
//!
//! Every failure past request validation is a [`GatewayError`]. Handlers never
//! surface its message to callers; see [`handlers`] for the HTTP mapping.

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Startup configuration is unusable
    #[error("{0}")]
    Config(String),
    /// The composed reference was rejected before any network traffic
    #[error("Invalid artifact reference {reference}: {message}")]
    InvalidReference { reference: String, message: String },
    /// Manifest resolution against the upstream registry failed
    #[error("Failed to pull {reference}: {message}")]
    Pull { reference: String, message: String },
    /// The artifact resolved but carries no layers
    #[error("No layers found in artifact {reference}")]
    NoLayers { reference: String },
    /// Opening the first layer's blob failed
    #[error("Failed to open layer {digest} of {reference}: {message}")]
    Layer {
        reference: String,
        digest: String,
        message: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
