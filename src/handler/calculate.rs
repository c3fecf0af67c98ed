use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::types::{
    Amount, ClaimedReward, EarnedAmount, RewardType, SimpleReward, UnclaimedSnapshot,
};

type Deltas = BTreeMap<(String, String), BTreeMap<String, BigDecimal>>;

/// Rewards earned between two snapshots:
/// `earned = new - previous + claimed` per delegator, validator and currency.
///
/// Pairs present on one side only are deltas against zero. Amounts are
/// returned at exponent `-precision`, ordered by delegator, validator and
/// currency.
pub fn calculate(
    previous: &UnclaimedSnapshot,
    new: &UnclaimedSnapshot,
    claims: &[ClaimedReward],
    precision: u32,
    height: u64,
    time: DateTime<Utc>,
) -> Vec<SimpleReward> {
    let mut deltas = Deltas::new();

    for (delegator, validators) in &new.delegators {
        for (validator, currencies) in validators {
            for amount in currencies.values() {
                add(&mut deltas, delegator, validator, amount, false);
            }
        }
    }

    for (delegator, validators) in &previous.delegators {
        for (validator, currencies) in validators {
            for amount in currencies.values() {
                add(&mut deltas, delegator, validator, amount, true);
            }
        }
    }

    for claim in claims {
        for amount in &claim.amounts {
            add(&mut deltas, &claim.account, &claim.validator, amount, false);
        }
    }

    let scale = i64::from(precision);
    let exp = -(precision as i32);

    deltas
        .into_iter()
        .map(|((account, validator), currencies)| SimpleReward {
            account,
            validator,
            amounts: currencies
                .into_iter()
                .map(|(currency, value)| {
                    let (numeric, _) = value.with_scale(scale).into_bigint_and_exponent();
                    EarnedAmount::new(currency, numeric, exp)
                })
                .collect(),
            height,
            time,
            reward_type: RewardType::Earned,
        })
        .collect()
}

fn add(
    deltas: &mut Deltas,
    delegator: &str,
    validator: &str,
    amount: &Amount,
    subtract: bool,
) {
    let value = deltas
        .entry((delegator.to_owned(), validator.to_owned()))
        .or_default()
        .entry(amount.currency.to_owned())
        .or_default();

    if subtract {
        *value -= amount.to_decimal();
    } else {
        *value += amount.to_decimal();
    }
}
