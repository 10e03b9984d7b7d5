use anyhow::Result;
use std::path::Path;

use super::{open_database, read_input, PostCommand};
use crate::models::{CreatePost, UpdatePost};
use crate::services::content::{self, ContentPipeline};
use crate::Config;

pub fn run(config_path: &Path, command: PostCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = open_database(&config)?;
    let pipeline = ContentPipeline::from_config(&config);

    match command {
        PostCommand::Add {
            title,
            file,
            summary,
            category,
            tags,
        } => {
            let post = content::create_post(
                &db,
                &pipeline,
                CreatePost {
                    title,
                    content: read_input(file.as_deref())?,
                    summary,
                    category,
                    tags,
                },
            )?;
            println!("{}", post.post.slug);
        }
        PostCommand::Edit {
            slug,
            title,
            file,
            summary,
            tags,
        } => {
            let content = match file {
                Some(path) => Some(read_input(Some(&path))?),
                None => None,
            };
            content::update_post(
                &db,
                &pipeline,
                &slug,
                UpdatePost {
                    title,
                    content,
                    summary,
                    tags,
                },
            )?;
            tracing::info!("Post '{}' updated", slug);
        }
        PostCommand::Show { slug } => match content::get_post_by_slug(&db, &slug)? {
            Some(post) => println!("{}", serde_json::to_string_pretty(&post)?),
            None => anyhow::bail!("Post '{}' not found", slug),
        },
        PostCommand::List => {
            println!("{:<40} {:<20}", "SLUG", "CREATED");
            println!("{}", "-".repeat(60));
            for post in content::list_posts(&db)? {
                println!("{:<40} {:<20}", post.slug, post.created_at);
            }
        }
    }

    Ok(())
}
