use anyhow::Result;
use std::path::Path;

use super::{open_database, read_input, CommentCommand};
use crate::services::content::{self, ContentPipeline};
use crate::Config;

pub fn run(config_path: &Path, command: CommentCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = open_database(&config)?;

    match command {
        CommentCommand::Add { post, file } => {
            let pipeline = ContentPipeline::from_config(&config);
            let body = read_input(file.as_deref())?;
            let comment = content::add_comment(&db, &pipeline, &post, &body)?;
            tracing::info!("Comment {} added to '{}'", comment.id, post);
        }
        CommentCommand::List { post } => {
            for comment in content::list_comments(&db, &post)? {
                println!("#{} {}\n{}\n", comment.id, comment.created_at, comment.content_html);
            }
        }
    }

    Ok(())
}
