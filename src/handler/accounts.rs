use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::{
    configuration::{AppState, State},
    error::Error,
    futures_set::try_fold_bounded,
    types::Delegation,
};

/// Every account delegating to any validator of the set at `height`.
pub async fn fetch_accounts(
    app_state: AppState<State>,
    height: u64,
) -> Result<BTreeSet<String>, Error> {
    let validators = app_state
        .client
        .get_height_validators(
            height,
            app_state.config.extraction.validator_fetch_page,
        )
        .await?;

    debug!("{} validators at height {}", validators.len(), height);

    let tasks = validators.into_iter().map(|validator| {
        proceed(app_state.clone(), height, validator.operator_address)
    });

    let accounts = try_fold_bounded(
        tasks,
        app_state.config.extraction.account_workers,
        BTreeSet::new(),
        |mut accounts, delegations| {
            accounts.extend(
                delegations
                    .into_iter()
                    .map(|delegation| delegation.delegator_address),
            );
            Ok(accounts)
        },
    )
    .await?;

    debug!("{} accounts at height {}", accounts.len(), height);

    Ok(accounts)
}

async fn proceed(
    state: AppState<State>,
    height: u64,
    validator: String,
) -> Result<Vec<Delegation>, Error> {
    let delegators = state
        .client
        .get_delegators(
            height,
            &validator,
            state.config.extraction.delegator_fetch_page,
        )
        .await;

    match delegators {
        Ok(delegators) => Ok(delegators),
        // The validator set can list validators not yet present at `height`.
        Err(Error::ValidatorNotFound(_)) => {
            warn!("validator {} not found at height {}", validator, height);
            Ok(vec![])
        },
        Err(error) => Err(error),
    }
}
