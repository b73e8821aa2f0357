use std::sync::Arc;

use log::info;
use tablepane::client::tui::AdminClientUI;
use tablepane::config::AdminConfig;
use tablepane::AdminManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = AdminConfig::from_env()?;
    info!("connecting to {}", config.base_url);
    let manager = Arc::new(AdminManager::connect(config)?);
    let mut tui = AdminClientUI::new(manager);
    tui.run().await?;

    Ok(())
}
