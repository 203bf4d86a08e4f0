use coyote::{app, Resources, Server, SessionStore};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coyote=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("COYOTE_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;
    let static_dir = std::env::var("COYOTE_STATIC_DIR")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "static".to_string());

    info!(%addr, static_dir = %static_dir, "starting coyote");

    let dispatcher = app::dispatcher(
        Resources::new(static_dir),
        Arc::new(SessionStore::new()),
        Arc::new(app::UserStore::seeded()),
    );

    Server::builder()
        .listener(TcpListener::bind(addr).await?)
        .dispatcher(dispatcher)
        .build()
        .launch()
        .await;

    Ok(())
}
