//! Standalone mock identity endpoint for local development.
//!
//! ```text
//! MOCK_IMDS_PORT=50342 cargo run -p mock-imds
//! ARMCTL_MSI_PORT=50342 armctl token
//! ```

use anyhow::{Context, Result};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("MOCK_IMDS_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(50342);

    // The real endpoint is only reachable from inside the host.
    serve(&format!("127.0.0.1:{port}")).await
}

async fn serve(addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(address = %addr, "mock identity endpoint listening");
    axum::serve(listener, mock_imds::router())
        .await
        .context("server error")?;

    Ok(())
}
