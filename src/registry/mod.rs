//! Upstream artifact access
//!
//! The gateway only needs two things from a registry: resolve a reference to
//! its layer list, and open one layer as a byte stream. [`ArtifactSource`]
//! captures exactly that so the HTTP layer can be exercised without a
//! network; [`OciRegistry`] is the production implementation.

pub mod oci_client;

pub use self::oci_client::{OciRegistry, OciRegistryBuilder};

use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

pub type LayerBody = BoxStream<'static, std::io::Result<Bytes>>;

/// An open, not yet consumed layer blob
pub struct LayerStream {
    /// Blob length, when the registry announced one
    pub content_length: Option<u64>,
    pub body: LayerBody,
}

impl std::fmt::Debug for LayerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub digest: String,
    pub media_type: String,
    pub size: i64,
}

/// A resolved artifact: its manifest digest and layers in manifest order
#[derive(Debug, Clone)]
pub struct PulledArtifact {
    pub reference: String,
    /// Manifest digest as reported by the registry
    pub digest: String,
    pub layers: Vec<LayerDescriptor>,
}

impl PulledArtifact {
    pub fn first_layer(&self) -> Result<&LayerDescriptor> {
        self.layers.first().ok_or_else(|| GatewayError::NoLayers {
            reference: self.reference.clone(),
        })
    }
}

#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Resolves `reference` (tag or digest form) to its manifest.
    async fn pull(&self, reference: &str) -> Result<PulledArtifact>;

    /// Opens the compressed bytes of `layer` without buffering them.
    async fn open_layer(
        &self,
        artifact: &PulledArtifact,
        layer: &LayerDescriptor,
    ) -> Result<LayerStream>;
}
