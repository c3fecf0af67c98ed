use std::{collections::BTreeMap, sync::Mutex};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub sequence: u64,
    pub content: Vec<u8>,
}

/// Durable storage of snapshots keyed by `(kind, sequence)`. Writes
/// overwrite the previous content of the same key.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn store_record(
        &self,
        kind: &str,
        sequence: u64,
        content: Vec<u8>,
    ) -> Result<(), Error>;

    /// Fails with [`Error::SnapshotMissing`] when nothing is stored.
    async fn fetch_record(
        &self,
        kind: &str,
        sequence: u64,
    ) -> Result<Vec<u8>, Error>;

    async fn store_records(
        &self,
        kind: &str,
        records: Vec<StoredRecord>,
    ) -> Result<(), Error>;

    /// Stored records with `from <= sequence <= to`, ascending.
    async fn fetch_records(
        &self,
        kind: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<StoredRecord>, Error>;

    /// The stored record with the highest sequence below `before`.
    async fn fetch_last_before(
        &self,
        kind: &str,
        before: u64,
    ) -> Result<Option<StoredRecord>, Error>;
}

pub async fn store_json<T: Serialize + Sync>(
    datastore: &dyn Datastore,
    kind: &str,
    sequence: u64,
    value: &T,
) -> Result<(), Error> {
    let content = serde_json::to_vec(value)?;
    datastore.store_record(kind, sequence, content).await
}

pub async fn fetch_json<T: DeserializeOwned>(
    datastore: &dyn Datastore,
    kind: &str,
    sequence: u64,
) -> Result<T, Error> {
    let content = datastore.fetch_record(kind, sequence).await?;
    Ok(serde_json::from_slice(&content)?)
}

/// Like [`fetch_json`], with a missing record reported as `None`.
pub async fn fetch_json_optional<T: DeserializeOwned>(
    datastore: &dyn Datastore,
    kind: &str,
    sequence: u64,
) -> Result<Option<T>, Error> {
    match fetch_json(datastore, kind, sequence).await {
        Ok(value) => Ok(Some(value)),
        Err(Error::SnapshotMissing { .. }) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Process-local datastore for `--in-memory` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    records: Mutex<BTreeMap<(String, u64), Vec<u8>>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_records<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<(String, u64), Vec<u8>>) -> T,
    ) -> Result<T, Error> {
        let mut records = self
            .records
            .lock()
            .map_err(|error| Error::TaskError(error.to_string()))?;
        Ok(f(&mut records))
    }

    pub fn len(&self) -> usize {
        self.with_records(|records| records.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn store_record(
        &self,
        kind: &str,
        sequence: u64,
        content: Vec<u8>,
    ) -> Result<(), Error> {
        self.with_records(|records| {
            records.insert((kind.to_owned(), sequence), content);
        })
    }

    async fn fetch_record(
        &self,
        kind: &str,
        sequence: u64,
    ) -> Result<Vec<u8>, Error> {
        self.with_records(|records| {
            records.get(&(kind.to_owned(), sequence)).cloned()
        })?
        .ok_or_else(|| Error::SnapshotMissing {
            kind: kind.to_owned(),
            sequence,
        })
    }

    async fn store_records(
        &self,
        kind: &str,
        items: Vec<StoredRecord>,
    ) -> Result<(), Error> {
        self.with_records(|records| {
            for item in items {
                records.insert((kind.to_owned(), item.sequence), item.content);
            }
        })
    }

    async fn fetch_records(
        &self,
        kind: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<StoredRecord>, Error> {
        if from > to {
            return Ok(vec![]);
        }

        self.with_records(|records| {
            records
                .range((kind.to_owned(), from)..=(kind.to_owned(), to))
                .map(|((_, sequence), content)| StoredRecord {
                    sequence: *sequence,
                    content: content.to_owned(),
                })
                .collect()
        })
    }

    async fn fetch_last_before(
        &self,
        kind: &str,
        before: u64,
    ) -> Result<Option<StoredRecord>, Error> {
        self.with_records(|records| {
            records
                .range((kind.to_owned(), 0)..(kind.to_owned(), before))
                .next_back()
                .map(|((_, sequence), content)| StoredRecord {
                    sequence: *sequence,
                    content: content.to_owned(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountsHeight;

    #[tokio::test]
    async fn missing_record_is_reported() {
        let datastore = MemoryDatastore::new();

        let result = datastore.fetch_record("account_records", 7).await;

        assert!(matches!(
            result,
            Err(Error::SnapshotMissing { sequence: 7, .. })
        ));
        assert!(
            fetch_json_optional::<AccountsHeight>(&datastore, "account_records", 7)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn json_contents_round_trip_and_overwrite() {
        let datastore = MemoryDatastore::new();
        let mut accounts = AccountsHeight {
            height: 100,
            sequence: 7,
            ..Default::default()
        };
        accounts.accounts.insert(String::from("cosmos1a"));

        store_json(&datastore, "account_records", 7, &accounts).await.unwrap();
        accounts.height = 101;
        store_json(&datastore, "account_records", 7, &accounts).await.unwrap();

        let stored: AccountsHeight =
            fetch_json(&datastore, "account_records", 7).await.unwrap();

        assert_eq!(stored, accounts);
        assert_eq!(datastore.len(), 1);
    }

    #[tokio::test]
    async fn ranges_stay_within_kind() {
        let datastore = MemoryDatastore::new();
        datastore
            .store_records(
                "tx_records",
                (10..15)
                    .map(|height| StoredRecord {
                        sequence: height,
                        content: vec![u8::try_from(height).unwrap()],
                    })
                    .collect(),
            )
            .await
            .unwrap();
        datastore
            .store_record("reward_records", 12, vec![0])
            .await
            .unwrap();

        let records = datastore.fetch_records("tx_records", 11, 13).await.unwrap();

        assert_eq!(
            records
                .iter()
                .map(|record| record.sequence)
                .collect::<Vec<_>>(),
            vec![11, 12, 13]
        );
        assert!(datastore
            .fetch_records("tx_records", 13, 11)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn last_before_skips_gaps() {
        let datastore = MemoryDatastore::new();
        for sequence in [3, 4, 9] {
            datastore
                .store_record("account_records", sequence, vec![0])
                .await
                .unwrap();
        }
        datastore
            .store_record("reward_records", 8, vec![0])
            .await
            .unwrap();

        let last = |before| datastore.fetch_last_before("account_records", before);

        assert_eq!(last(9).await.unwrap().map(|record| record.sequence), Some(4));
        assert_eq!(last(10).await.unwrap().map(|record| record.sequence), Some(9));
        assert!(last(3).await.unwrap().is_none());
        assert!(last(0).await.unwrap().is_none());
    }
}
