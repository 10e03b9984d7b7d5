use anyhow::Result;
use std::path::Path;

use crate::cli::open_database;
use crate::services::content::rerender_all_content;
use crate::services::markdown::ContentRenderer;
use crate::Config;

pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = open_database(&config)?;
    let renderer = ContentRenderer::new(config.policy_set());

    println!("Re-rendering all content...");
    let report = rerender_all_content(&db, &renderer)?;
    println!(
        "Checked {} posts and {} comments, {} updated.",
        report.posts, report.comments, report.changed
    );

    Ok(())
}
