//! OCI client adapter for pulling artifacts from the upstream registry
//!
//! Wraps the `oci-client` crate: manifest resolution, token negotiation and
//! blob transfer all happen there. This adapter converts its types into the
//! gateway's and its errors into [`GatewayError`]s.

use crate::config::UpstreamConfig;
use crate::error::handlers::RegistryErrorHandler;
use crate::error::{GatewayError, Result};
use crate::registry::{ArtifactSource, LayerDescriptor, LayerStream, PulledArtifact};
use ::oci_client::client::ClientConfig;
use ::oci_client::manifest::OciDescriptor;
use ::oci_client::secrets::RegistryAuth;
use ::oci_client::{Client, Reference};
use async_trait::async_trait;
use futures::StreamExt;

#[derive(Clone)]
pub struct OciRegistry {
    client: Client,
    auth: RegistryAuth,
}

/// Builder pattern for creating the registry client with configuration
pub struct OciRegistryBuilder {
    config: ClientConfig,
    auth: RegistryAuth,
}

impl Default for OciRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OciRegistryBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            auth: RegistryAuth::Anonymous,
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_auth(mut self, auth: RegistryAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn build(self) -> OciRegistry {
        OciRegistry {
            client: Client::new(self.config),
            auth: self.auth,
        }
    }
}

impl OciRegistry {
    pub fn builder() -> OciRegistryBuilder {
        OciRegistryBuilder::new()
    }

    pub fn from_config(upstream: &UpstreamConfig) -> Self {
        Self::builder()
            .with_config(upstream.client_config())
            .with_auth(upstream.registry_auth())
            .build()
    }

    fn parse_reference(reference: &str) -> Result<Reference> {
        Reference::try_from(reference).map_err(|e| GatewayError::InvalidReference {
            reference: reference.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ArtifactSource for OciRegistry {
    async fn pull(&self, reference: &str) -> Result<PulledArtifact> {
        let image = Self::parse_reference(reference)?;

        // Also stores the bearer token later blob requests rely on
        let (manifest, digest) = self
            .client
            .pull_image_manifest(&image, &self.auth)
            .await
            .map_err(|e| RegistryErrorHandler::pull_error(&e, reference))?;

        tracing::debug!(
            reference = %reference,
            digest = %digest,
            layers = manifest.layers.len(),
            "resolved artifact manifest"
        );

        Ok(PulledArtifact {
            reference: reference.to_string(),
            digest,
            layers: manifest
                .layers
                .into_iter()
                .map(|layer| LayerDescriptor {
                    digest: layer.digest,
                    media_type: layer.media_type,
                    size: layer.size,
                })
                .collect(),
        })
    }

    async fn open_layer(
        &self,
        artifact: &PulledArtifact,
        layer: &LayerDescriptor,
    ) -> Result<LayerStream> {
        let image = Self::parse_reference(&artifact.reference)?;
        let descriptor = OciDescriptor {
            media_type: layer.media_type.clone(),
            digest: layer.digest.clone(),
            size: layer.size,
            ..Default::default()
        };

        let blob = self
            .client
            .pull_blob_stream(&image, &descriptor)
            .await
            .map_err(|e| {
                RegistryErrorHandler::layer_error(&e, &artifact.reference, &layer.digest)
            })?;

        Ok(LayerStream {
            content_length: blob.content_length,
            body: blob.stream.boxed(),
        })
    }
}
