use sqlx::{Error, QueryBuilder};

use crate::model::{Record, Table};

use super::{DataBase, QueryResult};

impl Table<Record> {
    pub async fn upsert(
        &self,
        kind: &str,
        sequence: i64,
        content: &[u8],
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            INSERT INTO record ("type", sequence, content)
            VALUES($1, $2, $3)
            ON CONFLICT ("type", sequence)
            DO UPDATE SET content = EXCLUDED.content, created_at = NOW()
            "#,
        )
        .bind(kind)
        .bind(sequence)
        .bind(content)
        .persistent(true)
        .execute(&self.pool)
        .await
    }

    pub async fn upsert_many(
        &self,
        kind: &str,
        data: &[(i64, Vec<u8>)],
    ) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }

        let mut query_builder: QueryBuilder<DataBase> = QueryBuilder::new(
            r#"
            INSERT INTO record ("type", sequence, content)
            "#,
        );

        query_builder.push_values(data, |mut b, (sequence, content)| {
            b.push_bind(kind).push_bind(*sequence).push_bind(content);
        });

        query_builder.push(
            r#"
            ON CONFLICT ("type", sequence)
            DO UPDATE SET content = EXCLUDED.content, created_at = NOW()
            "#,
        );

        let query = query_builder.build().persistent(false);
        query.execute(&self.pool).await?;
        Ok(())
    }

    pub async fn get_one(
        &self,
        kind: &str,
        sequence: i64,
    ) -> Result<Option<Record>, Error> {
        sqlx::query_as(
            r#"
            SELECT "type", sequence, content, created_at
            FROM record WHERE "type" = $1 AND sequence = $2
            "#,
        )
        .bind(kind)
        .bind(sequence)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }

    /// Records with `from <= sequence <= to`, ascending.
    pub async fn get_range(
        &self,
        kind: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<Record>, Error> {
        sqlx::query_as(
            r#"
            SELECT "type", sequence, content, created_at
            FROM record
            WHERE "type" = $1 AND sequence >= $2 AND sequence <= $3
            ORDER BY sequence ASC
            "#,
        )
        .bind(kind)
        .bind(from)
        .bind(to)
        .persistent(true)
        .fetch_all(&self.pool)
        .await
    }

    /// Latest record with `sequence < before`.
    pub async fn get_last_before(
        &self,
        kind: &str,
        before: i64,
    ) -> Result<Option<Record>, Error> {
        sqlx::query_as(
            r#"
            SELECT "type", sequence, content, created_at
            FROM record
            WHERE "type" = $1 AND sequence < $2
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(kind)
        .bind(before)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }
}
