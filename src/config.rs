//! Runtime configuration, built once at startup and read-only afterwards

use crate::cli::args::Args;
use crate::error::{GatewayError, Result};
use oci_client::client::{ClientConfig, ClientProtocol};
use oci_client::secrets::RegistryAuth;

/// Credentials the gateway itself demands from callers
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Only the fully empty pair turns the gate off. A pair with one empty
    /// side is still enforced, expecting that side to be empty.
    pub fn is_enabled(&self) -> bool {
        !(self.username.is_empty() && self.password.is_empty())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// How the gateway talks to the upstream registry
#[derive(Clone, Default)]
pub struct UpstreamConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure: bool,
}

impl UpstreamConfig {
    pub fn registry_auth(&self) -> RegistryAuth {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                RegistryAuth::Basic(username.clone(), password.clone())
            }
            _ => RegistryAuth::Anonymous,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            protocol: if self.insecure {
                ClientProtocol::Http
            } else {
                ClientProtocol::Https
            },
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("username", &self.username)
            .field("insecure", &self.insecure)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Prefixed verbatim to every request path, e.g. `ghcr.io/acme/charts`
    pub upstream: String,
    pub port: u16,
    pub credentials: Credentials,
    pub registry: UpstreamConfig,
}

impl GatewayConfig {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            upstream: upstream.into(),
            port: 8080,
            credentials: Credentials::default(),
            registry: UpstreamConfig::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_registry(mut self, registry: UpstreamConfig) -> Self {
        self.registry = registry;
        self
    }

    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Self::new(args.upstream.clone().unwrap_or_default())
            .with_port(args.port)
            .with_credentials(Credentials::new(
                args.basic_auth_username.clone(),
                args.basic_auth_password.clone(),
            ))
            .with_registry(UpstreamConfig {
                username: args.upstream_username.clone(),
                password: args.upstream_password.clone(),
                insecure: args.insecure_upstream,
            });

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upstream.is_empty() {
            return Err(GatewayError::Config("--upstream is required".to_string()));
        }

        match (&self.registry.username, &self.registry.password) {
            (Some(_), None) => Err(GatewayError::Config(
                "--upstream-password is required when --upstream-username is set".to_string(),
            )),
            (None, Some(_)) => Err(GatewayError::Config(
                "--upstream-username is required when --upstream-password is set".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
