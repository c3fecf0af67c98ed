use std::collections::HashSet;

use bigdecimal::BigDecimal;

use crate::{
    error::Error,
    types::{Amount, Attribution, Delegators, MessageKind, RewardTx, UnclaimedSnapshot},
};

/// Reassigns the rewards of a redelegation to the validator whose unclaimed
/// balance before the transaction is closest to the withdrawn amount.
///
/// `unclaimed` holds the delegator's balances at `height - 1`. Each snapshot
/// balance can back one reward only; on equal distance the source validator
/// wins. The transaction is left untouched when any reward cannot be matched.
pub fn post_msg_begin_redelegate(tx: &mut RewardTx, unclaimed: &[Delegators]) -> Result<(), Error> {
    if tx.kind != MessageKind::MsgBeginRedelegate {
        return Ok(());
    }

    let mut snapshot = UnclaimedSnapshot::new(tx.meta.height.saturating_sub(1));
    for delegators in unclaimed {
        if delegators.delegator_address == tx.delegator {
            snapshot.add(delegators.clone());
        }
    }

    let mut rewards = tx.rewards.clone();
    let mut used = HashSet::new();

    for reward in rewards.iter_mut() {
        let Some(amount) = reward.amounts.first() else {
            continue;
        };

        let src = candidate(&snapshot, &used, &tx.delegator, &tx.validator_src, amount);
        let dst = candidate(&snapshot, &used, &tx.delegator, &tx.validator_dst, amount);

        let (validator, key) = match (src, dst) {
            (Some((src_key, src_delta)), Some((dst_key, dst_delta))) => {
                if dst_delta < src_delta {
                    (&tx.validator_dst, dst_key)
                } else {
                    (&tx.validator_src, src_key)
                }
            },
            (Some((src_key, _)), None) => (&tx.validator_src, src_key),
            (None, Some((dst_key, _))) => (&tx.validator_dst, dst_key),
            (None, None) => {
                return Err(Error::UnattributableReward {
                    hash: tx.meta.hash.to_owned(),
                    amount: amount.text.to_owned(),
                })
            },
        };

        reward.validator = validator.to_owned();
        reward.attribution = Attribution::Reconciled;
        used.insert(key);
    }

    tx.rewards = rewards;

    Ok(())
}

fn candidate(
    snapshot: &UnclaimedSnapshot,
    used: &HashSet<String>,
    delegator: &str,
    validator: &str,
    reward: &Amount,
) -> Option<(String, BigDecimal)> {
    let balance = snapshot.get(delegator, validator, &reward.currency)?;
    let key = format!("{}:{}", validator, balance.numeric);

    if used.contains(&key) {
        return None;
    }

    let delta = (balance.to_decimal() - reward.to_decimal()).abs();
    Some((key, delta))
}
