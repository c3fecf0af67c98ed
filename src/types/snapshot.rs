use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Amount, Delegators};

pub type ValidatorBalances = BTreeMap<String, BTreeMap<String, Amount>>;

/// Unclaimed rewards keyed delegator -> validator -> currency, as observed at
/// `height`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnclaimedSnapshot {
    pub height: u64,
    pub delegators: BTreeMap<String, ValidatorBalances>,
}

impl UnclaimedSnapshot {
    pub fn new(height: u64) -> Self {
        UnclaimedSnapshot {
            height,
            delegators: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, delegators: Delegators) {
        let validators = self
            .delegators
            .entry(delegators.delegator_address)
            .or_default();

        for item in delegators.unclaimed {
            let currencies = validators.entry(item.validator_address).or_default();

            for amount in item.unclaimed {
                match currencies.get_mut(&amount.currency) {
                    Some(existing) => *existing = existing.merged(&amount),
                    None => {
                        currencies.insert(amount.currency.to_owned(), amount);
                    },
                }
            }
        }
    }

    pub fn get(&self, delegator: &str, validator: &str, currency: &str) -> Option<&Amount> {
        self.delegators
            .get(delegator)
            .and_then(|validators| validators.get(validator))
            .and_then(|currencies| currencies.get(currency))
    }

    pub fn len(&self) -> usize {
        self.delegators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegators.is_empty()
    }
}

/// Accounts holding at least one delegation at `height`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountsHeight {
    pub height: u64,
    pub sequence: u64,
    pub accounts: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, DelegatorsUnclaimed};

    #[test]
    fn add_merges_repeated_currencies() {
        let mut snapshot = UnclaimedSnapshot::new(10);
        let delegators = Delegators {
            delegator_address: String::from("cosmos1a"),
            unclaimed: vec![
                DelegatorsUnclaimed {
                    validator_address: String::from("cosmosvaloper1v"),
                    unclaimed: vec![Amount::parse("uatom", "10uatom").unwrap()],
                },
                DelegatorsUnclaimed {
                    validator_address: String::from("cosmosvaloper1v"),
                    unclaimed: vec![Amount::parse("uatom", "5uatom").unwrap()],
                },
            ],
        };

        snapshot.add(delegators);

        let amount = snapshot.get("cosmos1a", "cosmosvaloper1v", "uatom").unwrap();
        assert_eq!(amount.text, "15uatom");
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("cosmos1a", "cosmosvaloper1v", "uosmo").is_none());
    }
}
