use clap::Parser;
use tracing::{error, Level};

use rewards_etl::{
    cli::{run_crossings, run_extract, run_rewards, Cli, Commands},
    error::Error,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            start,
            end,
            sequence,
            in_memory,
        } => run_extract(start, end, sequence, in_memory).await,
        Commands::Rewards {
            height,
            sequence,
            in_memory,
        } => run_rewards(height, sequence, in_memory).await,
        Commands::Crossings {
            start,
            end,
            sequence,
        } => run_crossings(start, end, sequence).await,
    }
}
