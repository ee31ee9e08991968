mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, CrdAction};
use tracing_subscriber::EnvFilter;
use yuptime::config::OperatorConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => commands::version::run()?,
        Commands::Run => commands::run::run().await?,
        Commands::Check { monitor } => commands::check::run(&monitor).await?,
        Commands::Discover => commands::discover::run(OperatorConfig::from_env()).await?,
        Commands::Crd { action } => match action {
            CrdAction::Generate => commands::crd::generate()?,
            CrdAction::Install => commands::crd::install().await?,
        },
    }

    Ok(())
}
