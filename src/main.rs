use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use warden::config::ServerConfig;
use warden::server::Server;
use warden::server::tls::load_acceptor;

const DEFAULT_CONFIG: &str = "config.txt";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = ServerConfig::load(&path).with_context(|| format!("loading {path}"))?;

    // Workers plus one spare; the accept loop runs on this thread
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.threads + 1)
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async move {
        let acceptor = load_acceptor(&cfg.cert, &cfg.key)?;
        let listener = TcpListener::bind(("0.0.0.0", cfg.port))
            .await
            .with_context(|| format!("failed to bind port {}", cfg.port))?;

        let server = Server::new(cfg, acceptor)?;
        server
            .run(listener, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
            })
            .await
    })
}
