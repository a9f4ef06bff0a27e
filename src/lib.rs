//! h2oci library
//!
//! Serves the first layer of OCI artifacts (typically Helm charts) as plain
//! `.tgz` downloads, optionally behind HTTP Basic authentication.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod reference;
pub mod registry;
pub mod server;

pub use config::{Credentials, GatewayConfig, UpstreamConfig};
pub use error::{GatewayError, Result};
pub use reference::{ArtifactReference, Selector};
pub use registry::{ArtifactSource, LayerDescriptor, LayerStream, OciRegistry, PulledArtifact};
