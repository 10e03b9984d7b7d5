use anyhow::Result;
use std::path::Path;

use super::{open_database, CategoryCommand};
use crate::models::CreateCategory;
use crate::services::tags;
use crate::Config;

pub fn run(config_path: &Path, command: CategoryCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = open_database(&config)?;
    let script = config.slug.script;

    match command {
        CategoryCommand::Add {
            name,
            slug,
            description,
        } => {
            let category = tags::create_category(
                &db,
                script,
                CreateCategory {
                    name,
                    slug,
                    description,
                },
            )?;
            println!("{}", category.slug);
        }
        CategoryCommand::Rename { slug, name } => {
            let category = tags::rename_category(&db, script, &slug, &name)?;
            tracing::info!("Category '{}' is now '{}'", slug, category.slug);
            println!("{}", category.slug);
        }
        CategoryCommand::List => {
            println!("{:<30} {:<30}", "NAME", "SLUG");
            println!("{}", "-".repeat(60));
            for category in tags::list_categories(&db)? {
                println!("{:<30} {:<30}", category.name, category.slug);
            }
        }
    }

    Ok(())
}
