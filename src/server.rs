//! HTTP surface of the gateway
//!
//! Every path is answered by a single fallback handler; there is no route
//! table because the request path itself names the artifact.

use crate::auth::{BasicAuth, require_basic_auth};
use crate::config::Credentials;
use crate::error::Result;
use crate::reference::ArtifactReference;
use crate::registry::ArtifactSource;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Router, middleware};
use futures::TryStreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<str>,
    pub registry: Arc<dyn ArtifactSource>,
}

impl AppState {
    pub fn new(upstream: &str, registry: Arc<dyn ArtifactSource>) -> Self {
        Self {
            upstream: Arc::from(upstream),
            registry,
        }
    }
}

/// Builds the gateway service. The Basic-auth gate wraps the artifact
/// handler only when `credentials` are enabled.
pub fn router(state: AppState, credentials: &Credentials) -> Router {
    let app = Router::new().fallback(serve_artifact).with_state(state);

    match BasicAuth::from_credentials(credentials) {
        Some(gate) => app.layer(middleware::from_fn_with_state(
            Arc::new(gate),
            require_basic_auth,
        )),
        None => app,
    }
}

async fn serve_artifact(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let Some(reference) = ArtifactReference::from_request(&state.upstream, uri.path(), uri.query())
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match stream_first_layer(state.registry.as_ref(), &reference.to_string()).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn stream_first_layer(registry: &dyn ArtifactSource, target: &str) -> Result<Response> {
    tracing::info!(reference = %target, "fetching oci artifact");

    let artifact = registry.pull(target).await?;
    let layer = artifact.first_layer()?;
    let blob = registry.open_layer(&artifact, layer).await?;

    tracing::debug!(
        reference = %target,
        layer = %layer.digest,
        size = ?blob.content_length,
        "streaming first layer"
    );

    let digest = layer.digest.clone();
    let body = blob.body.inspect_err(move |e| {
        tracing::warn!(layer = %digest, err = %e, "layer stream ended early");
    });

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/octet-stream");
    if let Some(length) = blob.content_length {
        response = response.header(CONTENT_LENGTH, length);
    }

    Ok(response
        .body(Body::from_stream(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

/// Serves `app` on `listener` until `shutdown` resolves, then drains
/// in-flight requests.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
