pub mod api;
pub mod config;
pub mod db;
pub mod tracing_setup;

use anyhow::Context;
use tracing::info;

use crate::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;
    tracing_setup::init_tracing(settings.log_debug)?;

    info!("starting social-repo");

    api::server::start_server(&settings).await
}
