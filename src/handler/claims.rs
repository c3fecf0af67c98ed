use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    configuration::{AppState, State},
    error::Error,
    futures_set::try_fold_bounded,
    model::RecordType,
    provider::StoredRecord,
    types::{ClaimedReward, DelegatorValidator, HeightTxs, MessageKind, RewardTx},
};

/// Claims and delegation changes of a height window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Claims {
    pub claims: Vec<ClaimedReward>,
    pub delegations: Vec<DelegatorValidator>,
}

/// Collects the claims of heights `from..=to`.
///
/// Heights already stored as tx records are reused, the rest are fetched,
/// mapped and stored. `block_times` saves a block query for the heights it
/// covers.
pub async fn fetch_claims(
    app_state: AppState<State>,
    from: u64,
    to: u64,
    block_times: &HashMap<u64, DateTime<Utc>>,
) -> Result<Claims, Error> {
    if from > to {
        return Ok(Claims::default());
    }

    let kind = RecordType::TxRecords.key(&app_state.config.extraction.datastore_prefix);
    let mut heights = BTreeMap::new();

    for record in app_state.datastore.fetch_records(&kind, from, to).await? {
        let item: HeightTxs = serde_json::from_slice(&record.content)?;
        heights.insert(record.sequence, item);
    }

    let missing = (from..=to)
        .filter(|height| !heights.contains_key(height))
        .collect::<Vec<u64>>();

    debug!(
        "claims of heights {}..={}: {} stored, {} to fetch",
        from,
        to,
        heights.len(),
        missing.len()
    );

    let tasks = missing.into_iter().map(|height| {
        proceed(app_state.clone(), height, block_times.get(&height).copied())
    });

    let fetched = try_fold_bounded(
        tasks,
        app_state.config.extraction.claim_workers,
        vec![],
        |mut fetched, item| {
            fetched.push(item);
            Ok(fetched)
        },
    )
    .await?;

    let mut records = Vec::with_capacity(fetched.len());
    for item in &fetched {
        records.push(StoredRecord {
            sequence: item.height,
            content: serde_json::to_vec(item)?,
        });
    }
    app_state.datastore.store_records(&kind, records).await?;

    heights.extend(fetched.into_iter().map(|item| (item.height, item)));

    let mut claims = Claims::default();
    for item in heights.values() {
        for tx in &item.txs {
            claims.claims.extend(app_state.producer.get_rewards(tx));
            claims.delegations.extend(app_state.producer.get_delegations(tx));
        }
    }

    Ok(claims)
}

async fn proceed(
    state: AppState<State>,
    height: u64,
    time: Option<DateTime<Utc>>,
) -> Result<HeightTxs, Error> {
    let time = match time {
        Some(time) => time,
        None => state.client.get_block(height).await?.time,
    };

    let (txs, responses) = state
        .client
        .get_raw_txs(height, state.config.extraction.tx_fetch_page)
        .await?;

    let mut txs = state
        .producer
        .map_transactions(height, time, &txs, &responses)?;

    reconcile_redelegations(&state, &mut txs).await?;

    Ok(HeightTxs { height, time, txs })
}

/// Replaces the positional guess of redelegation rewards with the match
/// against the delegator's balances one block earlier.
async fn reconcile_redelegations(
    state: &AppState<State>,
    txs: &mut [RewardTx],
) -> Result<(), Error> {
    for tx in txs
        .iter_mut()
        .filter(|tx| tx.kind == MessageKind::MsgBeginRedelegate && !tx.rewards.is_empty())
    {
        let unclaimed = state
            .client
            .get_delegations(tx.meta.height.saturating_sub(1), &tx.delegator)
            .await?;

        match state.producer.post_msg_begin_redelegate(tx, &[unclaimed]) {
            Ok(()) => {},
            Err(error @ Error::UnattributableReward { .. }) => {
                warn!("keeping positional attribution: {}", error);
            },
            Err(error) => return Err(error),
        }
    }

    Ok(())
}
