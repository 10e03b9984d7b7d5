pub mod category;
pub mod comment;
pub mod migrate;
pub mod post;
pub mod render;
pub mod rerender;
pub mod slug;
pub mod tag;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::services::policy::ContentClass;
use crate::services::slug::SlugKind;
use crate::{Config, Database};

#[derive(Parser)]
#[command(name = "penmark")]
#[command(version)]
#[command(about = "Slugs and sanitized Markdown for a blog", long_about = None)]
pub struct Cli {
    #[arg(short, long, env = "PENMARK_CONFIG", default_value = "penmark.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the slug a name would get
    Slug {
        name: String,
        #[arg(short, long, default_value = "post")]
        kind: SlugKind,
    },
    /// Render Markdown from a file (or stdin) to sanitized HTML
    Render {
        file: Option<PathBuf>,
        #[arg(long, default_value = "post")]
        class: ContentClass,
    },
    Migrate,
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    Tag {
        #[command(subcommand)]
        command: TagCommand,
    },
    Post {
        #[command(subcommand)]
        command: PostCommand,
    },
    Comment {
        #[command(subcommand)]
        command: CommentCommand,
    },
    /// Re-render every stored post and comment body
    Rerender,
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    Add {
        name: String,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
    Rename {
        slug: String,
        name: String,
    },
    List,
}

#[derive(Subcommand)]
pub enum TagCommand {
    Add { name: String },
    List,
}

#[derive(Subcommand)]
pub enum PostCommand {
    Add {
        #[arg(long)]
        title: String,
        /// Markdown body; read from stdin when omitted
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Comma separated tag names
        #[arg(long)]
        tags: Option<String>,
    },
    Edit {
        slug: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        tags: Option<String>,
    },
    Show {
        slug: String,
    },
    List,
}

#[derive(Subcommand)]
pub enum CommentCommand {
    Add {
        post: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    List {
        post: String,
    },
}

/// Read a Markdown body from `file`, or from stdin when no file is given.
pub(crate) fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Could not read '{}'", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Could not read stdin")?;
            Ok(buf)
        }
    }
}

/// Open the configured database with the schema brought up to date.
pub(crate) fn open_database(config: &Config) -> Result<Database> {
    let db = Database::open(&config.database.path, config.database.pool_size)?;
    db.migrate()?;
    Ok(db)
}
