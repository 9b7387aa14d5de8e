use std::sync::Arc;

use clap::Parser;
use messages2chat::server::build_router;
use messages2chat::util::{build_http_client_from_env, init_tracing};
use messages2chat::{Cli, HttpChatBackend, MessagesProxy, ProxyConfig, TracingObserver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loads .env before clap reads environment fallbacks.
    init_tracing();

    let cli = Cli::parse();
    let config = match ProxyConfig::from_cli(&cli) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        provider = %config.provider,
        model = %config.model,
        max_output_tokens = config.max_output_tokens,
        base_url = %config.base_url,
        "backend configured"
    );

    let backend = HttpChatBackend::new(build_http_client_from_env(), config.clone());
    let proxy = MessagesProxy::new(config, Arc::new(backend), Arc::new(TracingObserver));
    let app = build_router(proxy);

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!("Messages2Chat listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
