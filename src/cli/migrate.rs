use anyhow::Result;
use std::path::Path;

use crate::{Config, Database};

pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database.path, config.database.pool_size)?;
    db.migrate()?;
    tracing::info!("Migrations complete");
    Ok(())
}
