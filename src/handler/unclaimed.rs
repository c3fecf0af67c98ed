use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    configuration::{AppState, State},
    error::Error,
    futures_set::try_fold_bounded,
    helpers::retry,
    types::{Delegators, UnclaimedSnapshot},
};

/// Unclaimed rewards of `accounts` at `height`.
pub async fn fetch_unclaimed(
    app_state: AppState<State>,
    height: u64,
    accounts: &BTreeSet<String>,
) -> Result<UnclaimedSnapshot, Error> {
    let tasks = accounts
        .iter()
        .map(|account| proceed(app_state.clone(), height, account.to_owned()));

    let snapshot = try_fold_bounded(
        tasks,
        app_state.config.extraction.unclaimed_workers,
        UnclaimedSnapshot::new(height),
        |mut snapshot, delegators| {
            snapshot.add(delegators);
            Ok(snapshot)
        },
    )
    .await?;

    debug!(
        "unclaimed rewards of {} accounts at height {}",
        snapshot.len(),
        height
    );

    Ok(snapshot)
}

async fn proceed(
    state: AppState<State>,
    height: u64,
    account: String,
) -> Result<Delegators, Error> {
    let extraction = &state.config.extraction;

    retry(extraction.retry_attempts, extraction.retry_backoff, || {
        state.client.get_delegations(height, &account)
    })
    .await
}
