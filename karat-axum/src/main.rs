use anyhow::Result;
use karat_axum::config::{self, ConsoleSettings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = config::load_from_env();
    let settings = ConsoleSettings::from_config(&cfg.snapshot())?;

    let app = karat_axum::build(&settings)?;
    let addr = settings.addr();

    info!(%addr, project = %settings.master.project_id, "console listening");

    app.listen(addr).await?;

    Ok(())
}
