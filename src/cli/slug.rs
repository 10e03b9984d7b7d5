use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use crate::services::slug::{generate_slug_at, SlugKind};
use crate::Config;

pub fn run(config_path: &Path, name: &str, kind: SlugKind) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    println!("{}", generate_slug_at(name, kind, config.slug.script, Utc::now()));
    Ok(())
}
