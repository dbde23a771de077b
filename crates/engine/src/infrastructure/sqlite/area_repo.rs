//! SQLite-backed area and area-level storage.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use habitquest_domain::{Area, AreaId, AreaLevel, LevelProgress, UserId};

use super::{parse_enum, parse_opt_timestamp, parse_timestamp, parse_uuid};
use crate::infrastructure::ports::{AreaRepo, RepoError, Versioned};

pub struct SqliteAreaRepo {
    pool: SqlitePool,
}

impl SqliteAreaRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn area_from_row(row: &SqliteRow) -> Result<Area, RepoError> {
    let id: String = row.get("id");
    let level_curve: String = row.get("level_curve");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(Area {
        id: AreaId::from_uuid(parse_uuid(&id)?),
        name: row.get("name"),
        icon: row.get("icon"),
        xp_per_level: row.get::<i64, _>("xp_per_level").max(0) as u32,
        level_curve: parse_enum(&level_curve)?,
        level_multiplier: row.get("level_multiplier"),
        status: parse_enum(&status)?,
        archived_at: parse_opt_timestamp(row.get("archived_at"))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn area_level_from_row(row: &SqliteRow) -> Result<AreaLevel, RepoError> {
    let user_id: String = row.get("user_id");
    let area_id: String = row.get("area_id");

    Ok(AreaLevel {
        user_id: UserId::from_uuid(parse_uuid(&user_id)?),
        area_id: AreaId::from_uuid(parse_uuid(&area_id)?),
        progress: LevelProgress {
            level: row.get::<i64, _>("level").max(1) as u32,
            xp: row.get::<i64, _>("xp").max(0) as u64,
        },
    })
}

#[async_trait]
impl AreaRepo for SqliteAreaRepo {
    async fn get(&self, id: AreaId) -> Result<Option<Area>, RepoError> {
        let row = sqlx::query("SELECT * FROM areas WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("area.get", e))?;

        row.as_ref().map(area_from_row).transpose()
    }

    async fn save(&self, area: &Area) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO areas (
                id, name, icon, xp_per_level, level_curve, level_multiplier,
                status, archived_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                icon = excluded.icon,
                xp_per_level = excluded.xp_per_level,
                level_curve = excluded.level_curve,
                level_multiplier = excluded.level_multiplier,
                status = excluded.status,
                archived_at = excluded.archived_at
            "#,
        )
        .bind(area.id.to_string())
        .bind(&area.name)
        .bind(&area.icon)
        .bind(i64::from(area.xp_per_level))
        .bind(area.level_curve.as_str())
        .bind(area.level_multiplier)
        .bind(area.status.as_str())
        .bind(area.archived_at.map(|t| t.to_rfc3339()))
        .bind(area.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("area.save", e))?;

        Ok(())
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<Area>, RepoError> {
        let sql = if include_archived {
            "SELECT * FROM areas ORDER BY created_at"
        } else {
            "SELECT * FROM areas WHERE status = 'active' ORDER BY created_at"
        };

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("area.list", e))?;

        rows.iter().map(area_from_row).collect()
    }

    async fn get_level(
        &self,
        user_id: UserId,
        area_id: AreaId,
    ) -> Result<Option<Versioned<AreaLevel>>, RepoError> {
        let row = sqlx::query("SELECT * FROM area_levels WHERE user_id = ? AND area_id = ?")
            .bind(user_id.to_string())
            .bind(area_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("area.get_level", e))?;

        row.as_ref()
            .map(|row| {
                let level = area_level_from_row(row)?;
                Ok(Versioned::new(level, row.get("version")))
            })
            .transpose()
    }

    async fn list_levels(&self, user_id: UserId) -> Result<Vec<AreaLevel>, RepoError> {
        let rows = sqlx::query("SELECT * FROM area_levels WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("area.list_levels", e))?;

        rows.iter().map(area_level_from_row).collect()
    }
}
