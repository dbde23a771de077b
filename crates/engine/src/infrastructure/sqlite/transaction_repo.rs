//! SQLite-backed coin ledger reads.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use habitquest_domain::{Transaction, TransactionId, UserId};

use super::{parse_enum, parse_timestamp, parse_uuid};
use crate::infrastructure::ports::{RepoError, TransactionRepo};

pub struct SqliteTransactionRepo {
    pool: SqlitePool,
}

impl SqliteTransactionRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction, RepoError> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let kind: String = row.get("kind");
    let timestamp: String = row.get("timestamp");

    Ok(Transaction {
        id: TransactionId::from_uuid(parse_uuid(&id)?),
        user_id: UserId::from_uuid(parse_uuid(&user_id)?),
        kind: parse_enum(&kind)?,
        amount: row.get::<i64, _>("amount").max(0) as u64,
        description: row.get("description"),
        timestamp: parse_timestamp(&timestamp)?,
    })
}

#[async_trait]
impl TransactionRepo for SqliteTransactionRepo {
    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Transaction>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE user_id = ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("transaction.list_for_user", e))?;

        rows.iter().map(transaction_from_row).collect()
    }
}
