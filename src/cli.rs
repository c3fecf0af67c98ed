//! Command line entry points of the rewards extractor.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::{
    configuration::{get_configuration, set_configuration, AppState, Config, State},
    error::Error,
    handler::{crossings, rewards},
    mapper::Mapper,
    provider::{Client, DatabasePool, Datastore, Grpc, MemoryDatastore},
    types::{sequence_of, Crossing, HeightTime},
};

/// Staking rewards extractor
#[derive(Parser)]
#[command(name = "rewards-etl")]
#[command(about = "Hourly staking rewards of a Cosmos SDK chain", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk a height range and compute the rewards of every crossing
    Extract {
        #[arg(long)]
        start: u64,

        #[arg(long)]
        end: u64,

        /// Sequence already processed before `start`
        #[arg(long)]
        sequence: Option<u64>,

        /// Keep snapshots in memory instead of the database
        #[arg(long)]
        in_memory: bool,
    },

    /// Compute the rewards of a single crossing
    Rewards {
        #[arg(long)]
        height: u64,

        #[arg(long)]
        sequence: u64,

        #[arg(long)]
        in_memory: bool,
    },

    /// Print the crossings of a height range
    Crossings {
        #[arg(long)]
        start: u64,

        #[arg(long)]
        end: u64,

        #[arg(long)]
        sequence: Option<u64>,
    },
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

async fn init_state(config: Config, in_memory: bool) -> Result<AppState<State>, Error> {
    let client = Grpc::new(&config.grpc_host, config.client.clone()).await?;

    let datastore: Arc<dyn Datastore> = if in_memory {
        info!("keeping snapshots in memory");
        Arc::new(MemoryDatastore::new())
    } else {
        Arc::new(DatabasePool::new(&config.database_url).await?)
    };

    let producer = Mapper::new(config.chain.clone());
    let state = State::new(config, Arc::new(client), datastore, Arc::new(producer));

    Ok(AppState::new(state))
}

pub async fn run_extract(
    start: u64,
    end: u64,
    sequence: Option<u64>,
    in_memory: bool,
) -> Result<(), Error> {
    let config = init_config()?;
    let app_state = init_state(config, in_memory).await?;

    let items = rewards::run(app_state, start, end, sequence).await?;

    for item in &items {
        println!("{}", serde_json::to_string(item)?);
    }

    info!("{} sequences computed in {}..={}", items.len(), start, end);

    Ok(())
}

pub async fn run_rewards(height: u64, sequence: u64, in_memory: bool) -> Result<(), Error> {
    let config = init_config()?;
    let app_state = init_state(config, in_memory).await?;

    let block = app_state.client.get_block(height).await?;
    if sequence_of(&block.time) != sequence {
        warn!(
            "block {} at {} belongs to sequence {}, not {}",
            height,
            block.time,
            sequence_of(&block.time),
            sequence
        );
    }

    let crossing = Crossing {
        height,
        sequence,
        previous_height: height,
        block_times: vec![HeightTime {
            height,
            time: block.time,
        }],
    };

    match rewards::calculate_rewards(app_state, &crossing).await? {
        Some(item) => println!("{}", serde_json::to_string(&item)?),
        None => info!("sequence {} bootstrapped at height {}", sequence, height),
    }

    Ok(())
}

pub async fn run_crossings(start: u64, end: u64, sequence: Option<u64>) -> Result<(), Error> {
    let config = init_config()?;
    let client = Grpc::new(&config.grpc_host, config.client.clone()).await?;

    for crossing in crossings::walk(&client, start, end, sequence).await? {
        println!(
            "{}",
            serde_json::json!({
                "height": crossing.height,
                "sequence": crossing.sequence,
                "previous_height": crossing.previous_height,
            })
        );
    }

    Ok(())
}
