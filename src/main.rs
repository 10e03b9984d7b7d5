use clap::Parser;
use penmark::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "penmark=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Slug { name, kind }) => {
            penmark::cli::slug::run(&cli.config, &name, kind)?;
        }
        Some(Commands::Render { file, class }) => {
            penmark::cli::render::run(&cli.config, file.as_deref(), class)?;
        }
        Some(Commands::Migrate) => {
            penmark::cli::migrate::run(&cli.config)?;
        }
        Some(Commands::Category { command }) => {
            penmark::cli::category::run(&cli.config, command)?;
        }
        Some(Commands::Tag { command }) => {
            penmark::cli::tag::run(&cli.config, command)?;
        }
        Some(Commands::Post { command }) => {
            penmark::cli::post::run(&cli.config, command)?;
        }
        Some(Commands::Comment { command }) => {
            penmark::cli::comment::run(&cli.config, command)?;
        }
        Some(Commands::Rerender) => {
            penmark::cli::rerender::run(&cli.config)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
