//! SQLite-backed credit inventory.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use habitquest_domain::{BadHabitCredit, BadHabitId, CreditId, UserId};

use super::{parse_timestamp, parse_uuid};
use crate::infrastructure::ports::{CreditRepo, RepoError};

pub struct SqliteCreditRepo {
    pool: SqlitePool,
}

impl SqliteCreditRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn credit_from_row(row: &SqliteRow) -> Result<BadHabitCredit, RepoError> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let bad_habit_id: String = row.get("bad_habit_id");
    let purchased_at: String = row.get("purchased_at");

    Ok(BadHabitCredit {
        id: CreditId::from_uuid(parse_uuid(&id)?),
        user_id: UserId::from_uuid(parse_uuid(&user_id)?),
        bad_habit_id: BadHabitId::from_uuid(parse_uuid(&bad_habit_id)?),
        purchased_at: parse_timestamp(&purchased_at)?,
    })
}

#[async_trait]
impl CreditRepo for SqliteCreditRepo {
    async fn oldest_for(
        &self,
        user_id: UserId,
        bad_habit_id: BadHabitId,
    ) -> Result<Option<BadHabitCredit>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM credits
            WHERE user_id = ? AND bad_habit_id = ?
            ORDER BY purchased_at, id
            LIMIT 1
            "#,
        )
        .bind(user_id.to_string())
        .bind(bad_habit_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("credit.oldest_for", e))?;

        row.as_ref().map(credit_from_row).transpose()
    }

    async fn count_for(
        &self,
        user_id: UserId,
        bad_habit_id: BadHabitId,
    ) -> Result<u32, RepoError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credits WHERE user_id = ? AND bad_habit_id = ?")
                .bind(user_id.to_string())
                .bind(bad_habit_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepoError::database("credit.count_for", e))?;

        Ok(count.max(0) as u32)
    }
}
