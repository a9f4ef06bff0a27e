//! Command-line argument parsing

use crate::logging::LogFormat;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "h2oci")]
#[command(about = "Serve the first layer of OCI artifacts as plain .tgz downloads")]
#[command(version)]
pub struct Args {
    /// Upstream registry base, e.g. ghcr.io/acme/charts
    ///
    /// Optional at the parser level so a missing value is reported the same
    /// way as an empty one.
    #[arg(
        long = "upstream",
        help = "Registry address prefixed to every request path"
    )]
    pub upstream: Option<String>,

    #[arg(
        long = "port",
        default_value = "8080",
        help = "The port to listen on"
    )]
    pub port: u16,

    #[arg(
        long = "basic-auth-username",
        env = "H2OCI_BASIC_AUTH_USERNAME",
        default_value = "",
        hide_default_value = true,
        help = "Username callers must present via HTTP Basic auth"
    )]
    pub basic_auth_username: String,

    #[arg(
        long = "basic-auth-password",
        env = "H2OCI_BASIC_AUTH_PASSWORD",
        default_value = "",
        hide_default_value = true,
        hide_env_values = true,
        help = "Password callers must present via HTTP Basic auth"
    )]
    pub basic_auth_password: String,

    #[arg(
        long = "upstream-username",
        env = "H2OCI_UPSTREAM_USERNAME",
        help = "Username for the upstream registry (anonymous when unset)"
    )]
    pub upstream_username: Option<String>,

    #[arg(
        long = "upstream-password",
        env = "H2OCI_UPSTREAM_PASSWORD",
        hide_env_values = true,
        help = "Password for the upstream registry"
    )]
    pub upstream_password: Option<String>,

    #[arg(
        long = "insecure-upstream",
        help = "Use plain HTTP when talking to the upstream registry"
    )]
    pub insecure_upstream: bool,

    #[arg(
        long = "verbose",
        short = 'v',
        help = "Enable debug logging"
    )]
    pub verbose: bool,

    #[arg(
        long = "log-format",
        env = "H2OCI_LOG_FORMAT",
        value_enum,
        default_value = "text",
        help = "Log output format"
    )]
    pub log_format: LogFormat,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }
}
