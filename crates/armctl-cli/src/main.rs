//! `armctl`: authenticated requests against the resource-management
//! control plane.
//!
//! Configuration comes from `ARMCTL_*` environment variables (see
//! [`ClientConfig::from_env`]); flags given on the command line win.

use anyhow::{bail, Context, Result};
use armctl_sdk::config::{parse_endpoint, parse_timeout};
use armctl_sdk::{ArmClient, AuthMethod, ClientConfig, EndpointPort, ResourceScope};
use clap::{Parser, Subcommand};
use reqwest::Method;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "armctl")]
#[command(about = "Resource-management control-plane client")]
#[command(author, version, long_about = None)]
struct Cli {
    /// Control-plane base URL (overrides ARMCTL_ENDPOINT)
    #[arg(long, global = true, value_parser = parse_endpoint)]
    endpoint: Option<reqwest::Url>,

    /// managed-identity or access-token (overrides ARMCTL_AUTH)
    #[arg(long, global = true, value_parser = AuthMethod::parse)]
    auth: Option<AuthMethod>,

    /// Token audience (overrides ARMCTL_RESOURCE)
    #[arg(long, global = true)]
    resource: Option<ResourceScope>,

    /// Local identity endpoint port (overrides ARMCTL_MSI_PORT)
    #[arg(long, global = true)]
    msi_port: Option<EndpointPort>,

    /// User agent sent with every request (overrides ARMCTL_USER_AGENT)
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Seconds to wait for a token (overrides ARMCTL_TOKEN_TIMEOUT_SECS)
    #[arg(long, global = true, value_parser = parse_timeout)]
    token_timeout_secs: Option<std::time::Duration>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Acquire a token and print it as JSON
    Token,

    /// Send one request and print the response body
    Invoke {
        /// HTTP method (GET, PUT, POST, PATCH, DELETE, ...)
        #[arg(value_parser = parse_method)]
        method: Method,

        /// Resource path, e.g. /subscriptions/{id}/resourcegroups
        path: String,

        /// Value of the api-version query parameter
        #[arg(long)]
        api_version: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

fn parse_method(value: &str) -> Result<Method, String> {
    Method::from_bytes(value.to_ascii_uppercase().as_bytes())
        .map_err(|e| format!("invalid HTTP method {value:?}: {e}"))
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    fn config(&self, mut cfg: ClientConfig) -> ClientConfig {
        if let Some(endpoint) = &self.endpoint {
            cfg.endpoint = endpoint.clone();
        }
        if let Some(auth) = self.auth {
            cfg.auth = auth;
        }
        if let Some(resource) = &self.resource {
            cfg.resource = resource.clone();
        }
        if let Some(port) = self.msi_port {
            cfg.msi_port = port;
        }
        if let Some(user_agent) = &self.user_agent {
            cfg.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.token_timeout_secs {
            cfg.token_timeout = timeout;
        }
        cfg
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config(ClientConfig::from_env()?);
    debug!(command = ?cli.command, auth = %config.auth, "starting");

    match cli.command {
        Commands::Token => {
            let token = config
                .credential()?
                .retrieve_token(config.token_timeout)
                .await
                .context("failed to acquire token")?;
            println!("{}", serde_json::to_string(&token)?);
        }
        Commands::Invoke {
            method,
            path,
            api_version,
            body,
        } => {
            let body = body
                .as_deref()
                .map(|b| serde_json::from_str::<serde_json::Value>(b))
                .transpose()
                .context("--body is not valid JSON")?;

            let client = ArmClient::new(&config)?;
            let resp = client
                .send(method, &path, &api_version, body.as_ref())
                .await?;

            if !resp.is_success() {
                bail!("request failed with status {}: {}", resp.status(), resp.text());
            }
            println!("{}", resp.text());
        }
    }

    Ok(())
}
