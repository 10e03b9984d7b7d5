use anyhow::Result;
use std::path::Path;

use crate::cli::read_input;
use crate::services::markdown::render;
use crate::services::policy::ContentClass;
use crate::Config;

pub fn run(config_path: &Path, file: Option<&Path>, class: ContentClass) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let markdown = read_input(file)?;
    print!("{}", render(&markdown, config.policy_set().get(class)));
    Ok(())
}
