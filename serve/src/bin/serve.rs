//! Orchestrator ingress entry point.

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("SERVE_ADDR").ok();
    if let Err(e) = serve::run_serve(addr.as_deref()).await {
        tracing::error!("serve failed: {}", e);
        std::process::exit(1);
    }
}
