//! Runnable LAN chat relay.
//!
//! Binds the full relay (chat, matchmaking, encrypted relay, voice
//! signaling) on `LANCHAT_ADDR` (default `0.0.0.0:8765`).

use lanchat::RelayServerBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lanchat=info")),
        )
        .init();

    let addr = std::env::var("LANCHAT_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8765".to_string());

    let server = RelayServerBuilder::new().bind(&addr).build().await?;
    tracing::info!(addr = %server.local_addr()?, "relay listening");

    server.run().await?;
    Ok(())
}
