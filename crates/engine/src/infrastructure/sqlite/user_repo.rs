//! SQLite-backed user storage.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use habitquest_domain::{LevelProgress, User, UserId};

use super::{parse_enum, parse_opt_timestamp, parse_timestamp, parse_uuid};
use crate::infrastructure::ports::{RepoError, UserRepo, Versioned};

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<Versioned<User>, RepoError> {
    let id: String = row.get("id");
    let level_curve: String = row.get("level_curve");
    let xp_mode: String = row.get("xp_mode");
    let game_state: String = row.get("game_state");
    let created_at: String = row.get("created_at");

    let user = User {
        id: UserId::from_uuid(parse_uuid(&id)?),
        name: row.get("name"),
        life: row.get("life"),
        max_life: row.get("max_life"),
        coins: row.get::<i64, _>("coins").max(0) as u64,
        progress: LevelProgress {
            level: row.get::<i64, _>("level").max(1) as u32,
            xp: row.get::<i64, _>("xp").max(0) as u64,
        },
        xp_per_level: row.get::<i64, _>("xp_per_level").max(0) as u32,
        level_curve: parse_enum(&level_curve)?,
        level_multiplier: row.get("level_multiplier"),
        xp_mode: parse_enum(&xp_mode)?,
        game_state: parse_enum(&game_state)?,
        game_over_at: parse_opt_timestamp(row.get("game_over_at"))?,
        recovery_started_at: parse_opt_timestamp(row.get("recovery_started_at"))?,
        recovery_distance: row.get::<i64, _>("recovery_distance").max(0) as u32,
        recovery_target: row.get::<i64, _>("recovery_target").max(0) as u32,
        total_game_overs: row.get::<i64, _>("total_game_overs").max(0) as u32,
        created_at: parse_timestamp(&created_at)?,
    };

    Ok(Versioned::new(user, row.get("version")))
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn get(&self, id: UserId) -> Result<Option<Versioned<User>>, RepoError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("user.get", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, life, max_life, coins, level, xp, xp_per_level,
                level_curve, level_multiplier, xp_mode, game_state,
                game_over_at, recovery_started_at, recovery_distance,
                recovery_target, total_game_overs, created_at, version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(user.life)
        .bind(user.max_life)
        .bind(user.coins as i64)
        .bind(i64::from(user.progress.level))
        .bind(user.progress.xp as i64)
        .bind(i64::from(user.xp_per_level))
        .bind(user.level_curve.as_str())
        .bind(user.level_multiplier)
        .bind(user.xp_mode.as_str())
        .bind(user.game_state.as_str())
        .bind(user.game_over_at.map(|t| t.to_rfc3339()))
        .bind(user.recovery_started_at.map(|t| t.to_rfc3339()))
        .bind(i64::from(user.recovery_distance))
        .bind(i64::from(user.recovery_target))
        .bind(i64::from(user.total_game_overs))
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("user.insert", e))?;

        Ok(())
    }

    async fn update(&self, user: &Versioned<User>) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = ?, life = ?, max_life = ?, coins = ?, level = ?, xp = ?,
                xp_per_level = ?, level_curve = ?, level_multiplier = ?,
                xp_mode = ?, game_state = ?, game_over_at = ?,
                recovery_started_at = ?, recovery_distance = ?,
                recovery_target = ?, total_game_overs = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&user.value.name)
        .bind(user.value.life)
        .bind(user.value.max_life)
        .bind(user.value.coins as i64)
        .bind(i64::from(user.value.progress.level))
        .bind(user.value.progress.xp as i64)
        .bind(i64::from(user.value.xp_per_level))
        .bind(user.value.level_curve.as_str())
        .bind(user.value.level_multiplier)
        .bind(user.value.xp_mode.as_str())
        .bind(user.value.game_state.as_str())
        .bind(user.value.game_over_at.map(|t| t.to_rfc3339()))
        .bind(user.value.recovery_started_at.map(|t| t.to_rfc3339()))
        .bind(i64::from(user.value.recovery_distance))
        .bind(i64::from(user.value.recovery_target))
        .bind(i64::from(user.value.total_game_overs))
        .bind(user.value.id.to_string())
        .bind(user.version)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("user.update", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::stale("User", user.value.id));
        }

        Ok(())
    }
}
