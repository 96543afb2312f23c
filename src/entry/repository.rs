//! SQL entry repository for mailroom.
//!
//! This module stores entries in the `client` table through the sqlx pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;

use super::store::EntryStore;
use super::types::{Entry, EntryQuery, NewEntry};
use crate::db::{Database, DbBackend, DbPool};
use crate::Result;

/// Upper bound on IDs per `DELETE ... IN (...)` statement.
const BATCH_DELETE_CHUNK: usize = 500;

const SELECT_ENTRY: &str =
    "SELECT id, email, title, content, mailing_id, insert_time FROM client";

/// Repository for entry persistence.
#[derive(Debug, Clone)]
pub struct EntryRepository {
    pool: DbPool,
}

impl EntryRepository {
    /// Create a new EntryRepository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new EntryRepository sharing the database's pool.
    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}

#[async_trait]
impl EntryStore for EntryRepository {
    async fn insert(&self, entry: &NewEntry) -> Result<i64> {
        let mut query: QueryBuilder<DbBackend> = QueryBuilder::new(
            "INSERT INTO client (email, title, content, mailing_id, insert_time) ",
        );
        query.push_values(std::iter::once(entry), |mut row, e| {
            row.push_bind(e.recipient().to_string())
                .push_bind(e.title().to_string())
                .push_bind(e.content().to_string())
                .push_bind(e.campaign_id())
                .push_bind(e.inserted_at());
        });
        query.push(" RETURNING id");

        // Unique violations surface as MailroomError::Duplicate
        let id: i64 = query.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<Entry>> {
        let mut query: QueryBuilder<DbBackend> = QueryBuilder::new(SELECT_ENTRY);
        query.push(" WHERE id = ").push_bind(id);

        let row: Option<EntryRow> = query
            .build_query_as()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(EntryRow::into_entry))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM client WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn batch_delete(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in ids.chunks(BATCH_DELETE_CHUNK) {
            let mut query: QueryBuilder<DbBackend> =
                QueryBuilder::new("DELETE FROM client WHERE id IN (");
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            query.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, params: &EntryQuery) -> Result<Vec<Entry>> {
        let mut query: QueryBuilder<DbBackend> = QueryBuilder::new(SELECT_ENTRY);
        let mut keyword = " WHERE ";

        if let Some(campaign_id) = params.campaign_id {
            query.push(keyword).push("mailing_id = ").push_bind(campaign_id);
            keyword = " AND ";
        }
        if let Some(threshold) = params.inserted_before {
            query.push(keyword).push("insert_time < ").push_bind(threshold);
            keyword = " AND ";
        }
        if let Some(offset) = params.id_greater_than {
            // Keyset pagination: `id > offset` stays fast on the primary key
            query.push(keyword).push("id > ").push_bind(offset);
        }

        query.push(" ORDER BY id ASC");
        if let Some(limit) = params.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let rows: Vec<EntryRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(EntryRow::into_entry).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM client")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

/// Internal struct for mapping database rows to Entry.
#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    email: String,
    title: String,
    content: String,
    mailing_id: i64,
    insert_time: DateTime<Utc>,
}

impl EntryRow {
    fn into_entry(self) -> Entry {
        Entry {
            id: self.id,
            recipient: self.email,
            title: self.title,
            content: self.content,
            campaign_id: self.mailing_id,
            inserted_at: self.insert_time,
        }
    }
}
