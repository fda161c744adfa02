use crate::config;
use crate::server;

pub async fn handle(port: Option<u16>) -> anyhow::Result<()> {
    let config = config::config().clone();
    let port = port.unwrap_or(config.server.port);
    tracing::info!("Starting DevCamper API in {:?} mode", config.environment);

    let state = server::build_state(config).await?;
    server::serve(state, port).await
}
