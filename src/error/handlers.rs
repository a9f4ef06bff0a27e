//! Conversions from registry-client failures and into HTTP responses

use crate::error::GatewayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt::Display;

/// Categorizes errors returned by the OCI client so logs say what went wrong
/// without each call site repeating the same string checks.
pub struct RegistryErrorHandler;

impl RegistryErrorHandler {
    pub fn describe(error: &impl Display, context: &str) -> String {
        let text = error.to_string();
        let lowered = text.to_lowercase();

        if lowered.contains("unauthorized") || lowered.contains("authentication") {
            format!("Upstream rejected credentials during {}: {}", context, text)
        } else if lowered.contains("not found") || lowered.contains("manifest_unknown") {
            format!("Artifact not found during {}: {}", context, text)
        } else if lowered.contains("dns") || lowered.contains("connect") {
            format!("Cannot reach upstream during {}: {}", context, text)
        } else if lowered.contains("certificate") {
            format!("TLS certificate error during {}: {}", context, text)
        } else {
            format!("{} failed: {}", context, text)
        }
    }

    pub fn pull_error(error: &impl Display, reference: &str) -> GatewayError {
        GatewayError::Pull {
            reference: reference.to_string(),
            message: Self::describe(error, "manifest pull"),
        }
    }

    pub fn layer_error(error: &impl Display, reference: &str, digest: &str) -> GatewayError {
        GatewayError::Layer {
            reference: reference.to_string(),
            digest: digest.to_string(),
            message: Self::describe(error, "blob pull"),
        }
    }
}

/// Callers only ever see a bare status; the cause stays in the server log.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::NoLayers { reference } => {
                tracing::error!(reference = %reference, "no layers found in artifact");
            }
            GatewayError::Layer { reference, digest, .. } => {
                tracing::error!(
                    reference = %reference,
                    layer = %digest,
                    err = %self,
                    "extracting first layer failed"
                );
            }
            GatewayError::Pull { reference, .. }
            | GatewayError::InvalidReference { reference, .. } => {
                tracing::error!(reference = %reference, err = %self, "error fetching resource");
            }
            _ => {
                tracing::error!(err = %self, "request failed");
            }
        }

        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
