use anyhow::Result;
use std::path::Path;

use super::{open_database, TagCommand};
use crate::services::tags;
use crate::Config;

pub fn run(config_path: &Path, command: TagCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = open_database(&config)?;

    match command {
        TagCommand::Add { name } => {
            let tag = tags::create_tag(&db, config.slug.script, &name)?;
            println!("{}", tag.slug);
        }
        TagCommand::List => {
            println!("{:<30} {:<30}", "NAME", "SLUG");
            println!("{}", "-".repeat(60));
            for tag in tags::list_tags(&db)? {
                println!("{:<30} {:<30}", tag.name, tag.slug);
            }
        }
    }

    Ok(())
}
