pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use db::Database;
pub use services::markdown::{render, ContentRenderer};
pub use services::policy::{ContentClass, SanitizePolicy};
pub use services::slug::{generate_slug, SlugKind};
