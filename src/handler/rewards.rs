use std::collections::{BTreeSet, HashMap};

use anyhow::Context;
use tracing::{info, warn};

use crate::{
    configuration::{AppState, State},
    error::Error,
    model::RecordType,
    provider::{fetch_json_optional, store_json},
    types::{
        sequence_start, AccountsHeight, Crossing, DelegationOp, DelegatorValidator,
        Rewards, UnclaimedSnapshot, GROUPING,
    },
};

use super::{accounts, calculate::calculate, claims, crossings, unclaimed};

/// Walks `start..=end` and computes the rewards of every crossing found.
pub async fn run(
    app_state: AppState<State>,
    start: u64,
    end: u64,
    sequence: Option<u64>,
) -> Result<Vec<Rewards>, Error> {
    let crossings = crossings::walk(app_state.client.as_ref(), start, end, sequence).await?;
    let mut rewards = vec![];

    for crossing in &crossings {
        if let Some(item) = calculate_rewards(app_state.clone(), crossing).await? {
            rewards.push(item);
        }
    }

    Ok(rewards)
}

/// Computes and stores the rewards of one crossing.
///
/// The baseline is the latest sequence stored before this one. Without any,
/// the crossing only records the account set and unclaimed balances and
/// returns `None`. The earned record is written last, so a failed crossing
/// leaves no earned record behind.
pub async fn calculate_rewards(
    app_state: AppState<State>,
    crossing: &Crossing,
) -> Result<Option<Rewards>, Error> {
    let prefix = &app_state.config.extraction.datastore_prefix;
    let accounts_kind = RecordType::AccountRecords.key(prefix);
    let rewards_kind = RecordType::RewardRecords.key(prefix);
    let earned_kind = RecordType::EarnedRewardRecords.key(prefix);

    let height = crossing.height;
    let sequence = crossing.sequence;
    let datastore = app_state.datastore.as_ref();

    // Hours without blocks (chain halts) have no records.
    let Some(baseline) = datastore
        .fetch_last_before(&accounts_kind, sequence)
        .await?
    else {
        bootstrap(app_state.clone(), crossing).await?;
        return Ok(None);
    };

    let mut accounts: AccountsHeight = serde_json::from_slice(&baseline.content)?;

    if baseline.sequence + 1 < sequence {
        warn!(
            "sequence {} follows sequence {}, no blocks in between",
            sequence, baseline.sequence
        );
    }

    let previous =
        fetch_json_optional::<UnclaimedSnapshot>(datastore, &rewards_kind, baseline.sequence)
            .await?
            .unwrap_or_else(|| UnclaimedSnapshot::new(accounts.height));

    let block_times = crossing
        .block_times
        .iter()
        .map(|item| (item.height, item.time))
        .collect::<HashMap<_, _>>();

    let claims =
        claims::fetch_claims(app_state.clone(), previous.height + 1, height, &block_times)
            .await?;

    update_accounts(&app_state, &mut accounts.accounts, &claims.delegations, height).await?;
    accounts.height = height;
    accounts.sequence = sequence;
    store_json(datastore, &accounts_kind, sequence, &accounts).await?;

    let new = unclaimed::fetch_unclaimed(app_state.clone(), height, &accounts.accounts).await?;
    store_json(datastore, &rewards_kind, sequence, &new).await?;

    let time = sequence_start(sequence).context("Sequence out of range")?;
    let earned = calculate(
        &previous,
        &new,
        &claims.claims,
        app_state.config.chain.decimal_precision,
        height,
        time,
    );

    let rewards = Rewards {
        chain_id: app_state.config.chain.chain_id.to_owned(),
        network: app_state.config.chain.network.to_owned(),
        sequence,
        height,
        time,
        grouping: GROUPING.to_owned(),
        earned,
        claimed: claims.claims,
    };

    store_json(datastore, &earned_kind, sequence, &rewards).await?;

    info!(
        "sequence {} at height {}: {} earned, {} claimed",
        sequence,
        height,
        rewards.earned.len(),
        rewards.claimed.len()
    );

    Ok(Some(rewards))
}

async fn bootstrap(app_state: AppState<State>, crossing: &Crossing) -> Result<(), Error> {
    let prefix = &app_state.config.extraction.datastore_prefix;
    let accounts_kind = RecordType::AccountRecords.key(prefix);
    let rewards_kind = RecordType::RewardRecords.key(prefix);
    let datastore = app_state.datastore.as_ref();

    let existing =
        fetch_json_optional::<AccountsHeight>(datastore, &accounts_kind, crossing.sequence)
            .await?;

    if existing.is_some() {
        warn!(
            "initial accounts for sequence {} already stored",
            crossing.sequence
        );
        return Ok(());
    }

    warn!("fetching initial accounts at height {}", crossing.height);

    let accounts = AccountsHeight {
        height: crossing.height,
        sequence: crossing.sequence,
        accounts: accounts::fetch_accounts(app_state.clone(), crossing.height).await?,
    };

    let snapshot =
        unclaimed::fetch_unclaimed(app_state.clone(), crossing.height, &accounts.accounts)
            .await?;

    store_json(datastore, &rewards_kind, crossing.sequence, &snapshot).await?;
    store_json(datastore, &accounts_kind, crossing.sequence, &accounts).await?;

    Ok(())
}

/// Applies the delegation changes of the window to the account set.
/// Accounts that undelegated are dropped only when they hold no delegation
/// left at `height`.
async fn update_accounts(
    app_state: &AppState<State>,
    accounts: &mut BTreeSet<String>,
    changes: &[DelegatorValidator],
    height: u64,
) -> Result<(), Error> {
    let mut removed = BTreeSet::new();

    for change in changes {
        match change.op {
            DelegationOp::Add | DelegationOp::Both => {
                accounts.insert(change.delegator.to_owned());
            },
            DelegationOp::Remove => {
                removed.insert(change.delegator.to_owned());
            },
        }
    }

    for delegator in removed {
        let delegations = app_state
            .client
            .get_delegator_delegations(
                height,
                &delegator,
                app_state.config.extraction.delegator_fetch_page,
            )
            .await?;

        if delegations.is_empty() {
            accounts.remove(&delegator);
        }
    }

    Ok(())
}
