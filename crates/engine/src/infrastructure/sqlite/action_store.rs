//! Transactional commits for action write sets.
//!
//! Each commit runs in one SQLite transaction. User and area-level updates
//! assert the version the use case read; zero affected rows rolls the whole
//! set back as [`RepoError::Stale`] so the caller can re-read and retry.

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction as SqlTx};

use habitquest_domain::{AreaLevel, BadHabitLog, CreditId, HabitLog, Transaction, User};

use crate::infrastructure::ports::{
    ActionStore, BadHabitWrite, CompletionWrite, CreditPurchaseWrite, RepoError, Versioned,
};

pub struct SqliteActionStore {
    pool: SqlitePool,
}

impl SqliteActionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<SqlTx<'static, Sqlite>, RepoError> {
        self.pool
            .begin()
            .await
            .map_err(|e| RepoError::database("action.begin", e))
    }
}

/// Versioned user update. `require_active` additionally asserts the row is
/// still in the active state, so a state transition fires at most once.
async fn update_user(
    tx: &mut SqlTx<'_, Sqlite>,
    user: &Versioned<User>,
    require_active: bool,
) -> Result<(), RepoError> {
    let guard = if require_active {
        " AND game_state = 'active'"
    } else {
        ""
    };
    let sql = format!(
        r#"
        UPDATE users SET
            life = ?, coins = ?, level = ?, xp = ?, game_state = ?,
            game_over_at = ?, recovery_started_at = ?, recovery_distance = ?,
            total_game_overs = ?, version = version + 1
        WHERE id = ? AND version = ?{guard}
        "#
    );

    let result = sqlx::query(&sql)
        .bind(user.value.life)
        .bind(user.value.coins as i64)
        .bind(i64::from(user.value.progress.level))
        .bind(user.value.progress.xp as i64)
        .bind(user.value.game_state.as_str())
        .bind(user.value.game_over_at.map(|t| t.to_rfc3339()))
        .bind(user.value.recovery_started_at.map(|t| t.to_rfc3339()))
        .bind(i64::from(user.value.recovery_distance))
        .bind(i64::from(user.value.total_game_overs))
        .bind(user.value.id.to_string())
        .bind(user.version)
        .execute(&mut **tx)
        .await
        .map_err(|e| RepoError::database("action.update_user", e))?;

    if result.rows_affected() == 0 {
        return Err(RepoError::stale("User", user.value.id));
    }

    Ok(())
}

async fn upsert_area_level(
    tx: &mut SqlTx<'_, Sqlite>,
    level: &AreaLevel,
    version: Option<i64>,
) -> Result<(), RepoError> {
    match version {
        None => {
            sqlx::query(
                r#"
                INSERT INTO area_levels (user_id, area_id, level, xp, version)
                VALUES (?, ?, ?, ?, 0)
                "#,
            )
            .bind(level.user_id.to_string())
            .bind(level.area_id.to_string())
            .bind(i64::from(level.progress.level))
            .bind(level.progress.xp as i64)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                // A unique-key violation here means another completion
                // created the row first.
                if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                    RepoError::stale("AreaLevel", level.area_id)
                } else {
                    RepoError::database("action.insert_area_level", e)
                }
            })?;
        }
        Some(expected) => {
            let result = sqlx::query(
                r#"
                UPDATE area_levels SET level = ?, xp = ?, version = version + 1
                WHERE user_id = ? AND area_id = ? AND version = ?
                "#,
            )
            .bind(i64::from(level.progress.level))
            .bind(level.progress.xp as i64)
            .bind(level.user_id.to_string())
            .bind(level.area_id.to_string())
            .bind(expected)
            .execute(&mut **tx)
            .await
            .map_err(|e| RepoError::database("action.update_area_level", e))?;

            if result.rows_affected() == 0 {
                return Err(RepoError::stale("AreaLevel", level.area_id));
            }
        }
    }

    Ok(())
}

async fn insert_habit_log(tx: &mut SqlTx<'_, Sqlite>, log: &HabitLog) -> Result<(), RepoError> {
    sqlx::query("INSERT INTO habit_logs (id, user_id, habit_id, timestamp) VALUES (?, ?, ?, ?)")
        .bind(log.id.to_string())
        .bind(log.user_id.to_string())
        .bind(log.habit_id.to_string())
        .bind(log.timestamp.to_rfc3339())
        .execute(&mut **tx)
        .await
        .map_err(|e| RepoError::database("action.insert_habit_log", e))?;

    Ok(())
}

async fn insert_bad_habit_log(
    tx: &mut SqlTx<'_, Sqlite>,
    log: &BadHabitLog,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO bad_habit_logs (id, user_id, bad_habit_id, avoided_penalty, timestamp)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(log.id.to_string())
    .bind(log.user_id.to_string())
    .bind(log.bad_habit_id.to_string())
    .bind(i64::from(log.avoided_penalty))
    .bind(log.timestamp.to_rfc3339())
    .execute(&mut **tx)
    .await
    .map_err(|e| RepoError::database("action.insert_bad_habit_log", e))?;

    Ok(())
}

async fn insert_ledger(tx: &mut SqlTx<'_, Sqlite>, entry: &Transaction) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO transactions (id, user_id, kind, amount, description, timestamp)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.user_id.to_string())
    .bind(entry.kind.as_str())
    .bind(entry.amount as i64)
    .bind(&entry.description)
    .bind(entry.timestamp.to_rfc3339())
    .execute(&mut **tx)
    .await
    .map_err(|e| RepoError::database("action.insert_ledger", e))?;

    Ok(())
}

async fn delete_credit(tx: &mut SqlTx<'_, Sqlite>, id: CreditId) -> Result<(), RepoError> {
    let result = sqlx::query("DELETE FROM credits WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| RepoError::database("action.delete_credit", e))?;

    // Zero rows means a concurrent record consumed the credit first.
    if result.rows_affected() == 0 {
        return Err(RepoError::stale("BadHabitCredit", id));
    }

    Ok(())
}

async fn commit(tx: SqlTx<'_, Sqlite>) -> Result<(), RepoError> {
    tx.commit()
        .await
        .map_err(|e| RepoError::database("action.commit", e))
}

#[async_trait]
impl ActionStore for SqliteActionStore {
    async fn commit_completion(&self, write: CompletionWrite) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        update_user(&mut tx, &write.user, false).await?;
        upsert_area_level(&mut tx, &write.area_level, write.area_level_version).await?;
        insert_habit_log(&mut tx, &write.log).await?;
        insert_ledger(&mut tx, &write.ledger).await?;

        commit(tx).await
    }

    async fn commit_bad_habit(&self, write: BadHabitWrite) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        update_user(&mut tx, &write.user, write.triggers_game_over).await?;
        if let Some(credit_id) = write.consumed_credit {
            delete_credit(&mut tx, credit_id).await?;
        }
        insert_bad_habit_log(&mut tx, &write.log).await?;

        commit(tx).await
    }

    async fn commit_credit_purchase(&self, write: CreditPurchaseWrite) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        update_user(&mut tx, &write.user, false).await?;

        sqlx::query(
            r#"
            INSERT INTO credits (id, user_id, bad_habit_id, purchased_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(write.credit.id.to_string())
        .bind(write.credit.user_id.to_string())
        .bind(write.credit.bad_habit_id.to_string())
        .bind(write.credit.purchased_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("action.insert_credit", e))?;

        insert_ledger(&mut tx, &write.ledger).await?;

        commit(tx).await
    }
}
