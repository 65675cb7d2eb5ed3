use crate::infra::config::Config;
use std::net::SocketAddr;

pub async fn run_server(cfg: &Config) -> anyhow::Result<()> {
    let registry = crate::tools::registry::build_registry();
    tracing::info!(
        port = cfg.port,
        tools = ?registry.names(),
        "BOOT autosar-config-gateway server"
    );

    let app = crate::infra::http_app::build_app(registry);
    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
