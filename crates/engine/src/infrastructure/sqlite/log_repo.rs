//! SQLite-backed read access to the append-only logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use habitquest_domain::{BadHabitId, BadHabitLog, BadHabitLogId, GoodHabitId, HabitLog, HabitLogId, UserId};

use super::{parse_timestamp, parse_uuid};
use crate::infrastructure::ports::{LogRepo, RepoError};

pub struct SqliteLogRepo {
    pool: SqlitePool,
}

impl SqliteLogRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn habit_log_from_row(row: &SqliteRow) -> Result<HabitLog, RepoError> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let habit_id: String = row.get("habit_id");
    let timestamp: String = row.get("timestamp");

    Ok(HabitLog {
        id: HabitLogId::from_uuid(parse_uuid(&id)?),
        user_id: UserId::from_uuid(parse_uuid(&user_id)?),
        habit_id: GoodHabitId::from_uuid(parse_uuid(&habit_id)?),
        timestamp: parse_timestamp(&timestamp)?,
    })
}

fn bad_habit_log_from_row(row: &SqliteRow) -> Result<BadHabitLog, RepoError> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let bad_habit_id: String = row.get("bad_habit_id");
    let timestamp: String = row.get("timestamp");

    Ok(BadHabitLog {
        id: BadHabitLogId::from_uuid(parse_uuid(&id)?),
        user_id: UserId::from_uuid(parse_uuid(&user_id)?),
        bad_habit_id: BadHabitId::from_uuid(parse_uuid(&bad_habit_id)?),
        avoided_penalty: row.get::<i64, _>("avoided_penalty") != 0,
        timestamp: parse_timestamp(&timestamp)?,
    })
}

#[async_trait]
impl LogRepo for SqliteLogRepo {
    async fn good_completions_in(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HabitLog>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM habit_logs
            WHERE user_id = ? AND timestamp >= ? AND timestamp < ?
            ORDER BY timestamp
            "#,
        )
        .bind(user_id.to_string())
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("log.good_completions_in", e))?;

        rows.iter().map(habit_log_from_row).collect()
    }

    async fn bad_occurrences_in(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BadHabitLog>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM bad_habit_logs
            WHERE user_id = ? AND timestamp >= ? AND timestamp < ?
            ORDER BY timestamp
            "#,
        )
        .bind(user_id.to_string())
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("log.bad_occurrences_in", e))?;

        rows.iter().map(bad_habit_log_from_row).collect()
    }

    async fn total_reward_xp(&self, user_id: UserId) -> Result<u64, RepoError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(h.xp_reward), 0)
            FROM habit_logs l
            JOIN good_habits h ON h.id = l.habit_id
            WHERE l.user_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::database("log.total_reward_xp", e))?;

        Ok(total.max(0) as u64)
    }
}
