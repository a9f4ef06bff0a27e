//! Shared fixtures: chart archives, an in-memory artifact source and a
//! minimal OCI distribution server.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures::StreamExt;
use h2oci::error::{GatewayError, Result};
use h2oci::registry::{ArtifactSource, LayerDescriptor, LayerStream, PulledArtifact};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const HELM_LAYER_MEDIA_TYPE: &str = "application/vnd.cncf.helm.chart.content.v1.tar+gzip";
pub const HELM_CONFIG_MEDIA_TYPE: &str = "application/vnd.cncf.helm.config.v1+json";
pub const OCI_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

/// A gzipped tarball holding a single `Chart.yaml`
pub fn chart_archive(name: &str, version: &str) -> Vec<u8> {
    let chart_yaml = format!("apiVersion: v2\nname: {}\nversion: {}\n", name, version);

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(chart_yaml.len() as u64);
    header.set_mode(0o644);
    builder
        .append_data(&mut header, format!("{}/Chart.yaml", name), chart_yaml.as_bytes())
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

pub fn sha256_digest(data: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

pub fn layer(data: &[u8]) -> LayerDescriptor {
    LayerDescriptor {
        digest: sha256_digest(data),
        media_type: HELM_LAYER_MEDIA_TYPE.to_string(),
        size: data.len() as i64,
    }
}

/// What the in-memory source should do for every request
#[derive(Clone)]
pub enum Behaviour {
    Serve(Vec<Vec<u8>>),
    FailPull,
    FailOpen(Vec<Vec<u8>>),
    /// Serves one layer whose stream yields it as a single chunk and then
    /// never completes
    Stall(Vec<u8>),
}

/// Sets its flag when the layer stream owning it is dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// In-memory [`ArtifactSource`] recording every reference it was asked for
#[derive(Clone)]
pub struct FakeSource {
    behaviour: Behaviour,
    pub pulled: Arc<Mutex<Vec<String>>>,
    pub opened: Arc<Mutex<Vec<String>>>,
    pub stream_dropped: Arc<AtomicBool>,
}

impl FakeSource {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            pulled: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(Mutex::new(Vec::new())),
            stream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn serving(layers: Vec<Vec<u8>>) -> Self {
        Self::new(Behaviour::Serve(layers))
    }

    pub fn pulled(&self) -> Vec<String> {
        self.pulled.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }

    fn layers(&self) -> &[Vec<u8>] {
        match &self.behaviour {
            Behaviour::Serve(layers) | Behaviour::FailOpen(layers) => layers,
            Behaviour::Stall(data) => std::slice::from_ref(data),
            Behaviour::FailPull => &[],
        }
    }
}

#[async_trait]
impl ArtifactSource for FakeSource {
    async fn pull(&self, reference: &str) -> Result<PulledArtifact> {
        self.pulled.lock().unwrap().push(reference.to_string());

        if let Behaviour::FailPull = self.behaviour {
            return Err(GatewayError::Pull {
                reference: reference.to_string(),
                message: "MANIFEST_UNKNOWN".to_string(),
            });
        }

        Ok(PulledArtifact {
            reference: reference.to_string(),
            digest: sha256_digest(reference.as_bytes()),
            layers: self.layers().iter().map(|data| layer(data)).collect(),
        })
    }

    async fn open_layer(
        &self,
        artifact: &PulledArtifact,
        descriptor: &LayerDescriptor,
    ) -> Result<LayerStream> {
        self.opened.lock().unwrap().push(descriptor.digest.clone());

        if let Behaviour::FailOpen(_) = self.behaviour {
            return Err(GatewayError::Layer {
                reference: artifact.reference.clone(),
                digest: descriptor.digest.clone(),
                message: "BLOB_UNKNOWN".to_string(),
            });
        }

        let data = self
            .layers()
            .iter()
            .find(|data| sha256_digest(data) == descriptor.digest)
            .cloned()
            .unwrap_or_default();

        if let Behaviour::Stall(_) = self.behaviour {
            let guard = DropFlag(self.stream_dropped.clone());
            let first: std::io::Result<Bytes> = Ok(Bytes::from(data));
            let body = futures::stream::once(async move { first })
                .chain(futures::stream::pending())
                .map(move |chunk| {
                    let _held = &guard;
                    chunk
                });
            return Ok(LayerStream {
                content_length: None,
                body: body.boxed(),
            });
        }

        // Several small chunks so the response is genuinely streamed
        let chunks: Vec<std::io::Result<Bytes>> = data
            .chunks(7)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();

        Ok(LayerStream {
            content_length: Some(data.len() as u64),
            body: futures::stream::iter(chunks).boxed(),
        })
    }
}

/// Contents of the fake distribution server: one repository, one tag
#[derive(Clone)]
pub struct RegistryContents {
    pub repository: String,
    pub tag: String,
    pub manifest: Vec<u8>,
    pub manifest_digest: String,
    pub blobs: HashMap<String, Vec<u8>>,
    pub blob_requests: Arc<Mutex<Vec<String>>>,
}

impl RegistryContents {
    pub fn new(repository: &str, tag: &str, layers: &[Vec<u8>]) -> Self {
        let config = br#"{"name":"demo","version":"0.1.0"}"#.to_vec();
        let mut blobs = HashMap::new();
        blobs.insert(sha256_digest(&config), config.clone());

        let layer_descriptors: Vec<serde_json::Value> = layers
            .iter()
            .map(|data| {
                blobs.insert(sha256_digest(data), data.clone());
                serde_json::json!({
                    "mediaType": HELM_LAYER_MEDIA_TYPE,
                    "digest": sha256_digest(data),
                    "size": data.len(),
                })
            })
            .collect();

        let manifest = serde_json::to_vec(&serde_json::json!({
            "schemaVersion": 2,
            "mediaType": OCI_MANIFEST_MEDIA_TYPE,
            "config": {
                "mediaType": HELM_CONFIG_MEDIA_TYPE,
                "digest": sha256_digest(&config),
                "size": config.len(),
            },
            "layers": layer_descriptors,
        }))
        .unwrap();

        Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
            manifest_digest: sha256_digest(&manifest),
            manifest,
            blobs,
            blob_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn blob_requests(&self) -> Vec<String> {
        self.blob_requests.lock().unwrap().clone()
    }
}

async fn distribution_api(
    State(contents): State<RegistryContents>,
    method: Method,
    uri: Uri,
) -> Response {
    const V2_PREFIX: &str = "/v2/";
    const MANIFESTS: &str = "/manifests/";
    const BLOBS: &str = "/blobs/";

    let path = uri.path();
    if path == V2_PREFIX || path == "/v2" {
        return (StatusCode::OK, "{}").into_response();
    }
    let Some(rest) = path.strip_prefix(V2_PREFIX) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(idx) = rest.rfind(MANIFESTS) {
        let (name, reference) = (&rest[..idx], &rest[idx + MANIFESTS.len()..]);
        if name != contents.repository
            || (reference != contents.tag && reference != contents.manifest_digest)
        {
            return (StatusCode::NOT_FOUND, r#"{"errors":[{"code":"MANIFEST_UNKNOWN"}]}"#)
                .into_response();
        }

        let body = if method == Method::HEAD {
            Body::empty()
        } else {
            Body::from(contents.manifest.clone())
        };
        return Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", OCI_MANIFEST_MEDIA_TYPE)
            .header("Content-Length", contents.manifest.len())
            .header("Docker-Content-Digest", contents.manifest_digest.clone())
            .body(body)
            .unwrap();
    }

    if let Some(idx) = rest.rfind(BLOBS) {
        let (name, digest) = (&rest[..idx], &rest[idx + BLOBS.len()..]);
        contents.blob_requests.lock().unwrap().push(digest.to_string());

        return match contents.blobs.get(digest) {
            Some(data) if name == contents.repository => Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/octet-stream")
                .header("Content-Length", data.len())
                .header("Docker-Content-Digest", digest)
                .body(Body::from(data.clone()))
                .unwrap(),
            _ => (StatusCode::NOT_FOUND, r#"{"errors":[{"code":"BLOB_UNKNOWN"}]}"#)
                .into_response(),
        };
    }

    StatusCode::NOT_FOUND.into_response()
}

/// Starts the fake distribution server on an ephemeral port.
pub async fn spawn_registry(contents: RegistryContents) -> SocketAddr {
    let app = Router::new()
        .fallback(distribution_api)
        .with_state(contents);

    spawn_app(app).await
}

/// Serves `app` on an ephemeral localhost port for the rest of the test.
pub async fn spawn_app(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    addr
}
