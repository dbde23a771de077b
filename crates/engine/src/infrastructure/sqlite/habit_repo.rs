//! SQLite-backed habit definition storage.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use habitquest_domain::{AreaId, BadHabit, BadHabitId, GoodHabit, GoodHabitId};

use super::{parse_enum, parse_opt_timestamp, parse_timestamp, parse_uuid};
use crate::infrastructure::ports::{HabitRepo, RepoError};

pub struct SqliteHabitRepo {
    pool: SqlitePool,
}

impl SqliteHabitRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn good_from_row(row: &SqliteRow) -> Result<GoodHabit, RepoError> {
    let id: String = row.get("id");
    let area_id: String = row.get("area_id");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(GoodHabit {
        id: GoodHabitId::from_uuid(parse_uuid(&id)?),
        area_id: AreaId::from_uuid(parse_uuid(&area_id)?),
        name: row.get("name"),
        xp_reward: row.get::<i64, _>("xp_reward").max(0) as u32,
        coin_reward: row.get::<i64, _>("coin_reward").max(0) as u32,
        cadence: row.get("cadence"),
        is_active: row.get::<i64, _>("is_active") != 0,
        status: parse_enum(&status)?,
        archived_at: parse_opt_timestamp(row.get("archived_at"))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn bad_from_row(row: &SqliteRow) -> Result<BadHabit, RepoError> {
    let id: String = row.get("id");
    let area_id: Option<String> = row.get("area_id");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(BadHabit {
        id: BadHabitId::from_uuid(parse_uuid(&id)?),
        area_id: area_id
            .map(|s| parse_uuid(&s).map(AreaId::from_uuid))
            .transpose()?,
        name: row.get("name"),
        life_penalty: row.get::<i64, _>("life_penalty").max(0) as u32,
        controllable: row.get::<i64, _>("controllable") != 0,
        coin_cost: row.get::<i64, _>("coin_cost").max(0) as u32,
        is_active: row.get::<i64, _>("is_active") != 0,
        status: parse_enum(&status)?,
        archived_at: parse_opt_timestamp(row.get("archived_at"))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait]
impl HabitRepo for SqliteHabitRepo {
    async fn get_good(&self, id: GoodHabitId) -> Result<Option<GoodHabit>, RepoError> {
        let row = sqlx::query("SELECT * FROM good_habits WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("habit.get_good", e))?;

        row.as_ref().map(good_from_row).transpose()
    }

    async fn save_good(&self, habit: &GoodHabit) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO good_habits (
                id, area_id, name, xp_reward, coin_reward, cadence,
                is_active, status, archived_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                area_id = excluded.area_id,
                name = excluded.name,
                xp_reward = excluded.xp_reward,
                coin_reward = excluded.coin_reward,
                cadence = excluded.cadence,
                is_active = excluded.is_active,
                status = excluded.status,
                archived_at = excluded.archived_at
            "#,
        )
        .bind(habit.id.to_string())
        .bind(habit.area_id.to_string())
        .bind(&habit.name)
        .bind(i64::from(habit.xp_reward))
        .bind(i64::from(habit.coin_reward))
        .bind(&habit.cadence)
        .bind(i64::from(habit.is_active))
        .bind(habit.status.as_str())
        .bind(habit.archived_at.map(|t| t.to_rfc3339()))
        .bind(habit.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("habit.save_good", e))?;

        Ok(())
    }

    async fn list_good(&self, include_archived: bool) -> Result<Vec<GoodHabit>, RepoError> {
        let sql = if include_archived {
            "SELECT * FROM good_habits ORDER BY created_at"
        } else {
            "SELECT * FROM good_habits WHERE status = 'active' ORDER BY created_at"
        };

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("habit.list_good", e))?;

        rows.iter().map(good_from_row).collect()
    }

    async fn count_active_good(&self) -> Result<u32, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM good_habits WHERE status = 'active' AND is_active = 1",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::database("habit.count_active_good", e))?;

        Ok(count.max(0) as u32)
    }

    async fn get_bad(&self, id: BadHabitId) -> Result<Option<BadHabit>, RepoError> {
        let row = sqlx::query("SELECT * FROM bad_habits WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("habit.get_bad", e))?;

        row.as_ref().map(bad_from_row).transpose()
    }

    async fn save_bad(&self, habit: &BadHabit) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO bad_habits (
                id, area_id, name, life_penalty, controllable, coin_cost,
                is_active, status, archived_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                area_id = excluded.area_id,
                name = excluded.name,
                life_penalty = excluded.life_penalty,
                controllable = excluded.controllable,
                coin_cost = excluded.coin_cost,
                is_active = excluded.is_active,
                status = excluded.status,
                archived_at = excluded.archived_at
            "#,
        )
        .bind(habit.id.to_string())
        .bind(habit.area_id.map(|id| id.to_string()))
        .bind(&habit.name)
        .bind(i64::from(habit.life_penalty))
        .bind(i64::from(habit.controllable))
        .bind(i64::from(habit.coin_cost))
        .bind(i64::from(habit.is_active))
        .bind(habit.status.as_str())
        .bind(habit.archived_at.map(|t| t.to_rfc3339()))
        .bind(habit.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("habit.save_bad", e))?;

        Ok(())
    }

    async fn list_bad(&self, include_archived: bool) -> Result<Vec<BadHabit>, RepoError> {
        let sql = if include_archived {
            "SELECT * FROM bad_habits ORDER BY created_at"
        } else {
            "SELECT * FROM bad_habits WHERE status = 'active' ORDER BY created_at"
        };

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("habit.list_bad", e))?;

        rows.iter().map(bad_from_row).collect()
    }
}
