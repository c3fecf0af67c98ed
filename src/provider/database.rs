use async_trait::async_trait;

use crate::{
    dao::{PoolOption, PoolType},
    error::Error,
    migration::run_migrations,
    model::{Record, Table},
};

use super::{Datastore, StoredRecord};

// Three bind parameters per row, postgres allows 65535 per statement.
const UPSERT_CHUNK: usize = 1000;

#[derive(Debug)]
pub struct DatabasePool {
    pub record: Table<Record>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(database_url: &str) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(20)
            .connect(database_url)
            .await?;

        run_migrations(&pool).await?;

        Ok(DatabasePool {
            record: Table::new(pool.clone()),
            pool,
        })
    }

    pub fn get_pool(&self) -> &PoolType {
        &self.pool
    }
}

#[async_trait]
impl Datastore for DatabasePool {
    async fn store_record(
        &self,
        kind: &str,
        sequence: u64,
        content: Vec<u8>,
    ) -> Result<(), Error> {
        self.record
            .upsert(kind, i64::try_from(sequence)?, &content)
            .await?;
        Ok(())
    }

    async fn fetch_record(
        &self,
        kind: &str,
        sequence: u64,
    ) -> Result<Vec<u8>, Error> {
        self.record
            .get_one(kind, i64::try_from(sequence)?)
            .await?
            .map(|record| record.content)
            .ok_or_else(|| Error::SnapshotMissing {
                kind: kind.to_owned(),
                sequence,
            })
    }

    async fn store_records(
        &self,
        kind: &str,
        records: Vec<StoredRecord>,
    ) -> Result<(), Error> {
        let mut data = Vec::with_capacity(records.len());
        for record in records {
            data.push((i64::try_from(record.sequence)?, record.content));
        }

        for chunk in data.chunks(UPSERT_CHUNK) {
            self.record.upsert_many(kind, chunk).await?;
        }

        Ok(())
    }

    async fn fetch_records(
        &self,
        kind: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<StoredRecord>, Error> {
        let records = self
            .record
            .get_range(kind, i64::try_from(from)?, i64::try_from(to)?)
            .await?;

        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            stored.push(StoredRecord {
                sequence: u64::try_from(record.sequence)?,
                content: record.content,
            });
        }

        Ok(stored)
    }

    async fn fetch_last_before(
        &self,
        kind: &str,
        before: u64,
    ) -> Result<Option<StoredRecord>, Error> {
        let record = self
            .record
            .get_last_before(kind, i64::try_from(before)?)
            .await?;

        match record {
            Some(record) => Ok(Some(StoredRecord {
                sequence: u64::try_from(record.sequence)?,
                content: record.content,
            })),
            None => Ok(None),
        }
    }
}
