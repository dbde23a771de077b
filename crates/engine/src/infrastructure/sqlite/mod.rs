//! SQLite-backed repository implementations.
//!
//! Rows are stored with RFC 3339 TEXT timestamps and UUID TEXT ids. Contended
//! rows (users, area_levels) carry an integer `version` column; action write
//! sets assert the version they were read at and bump it on commit.

use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::infrastructure::ports::RepoError;

mod action_store;
mod area_repo;
mod credit_repo;
mod habit_repo;
mod log_repo;
mod transaction_repo;
mod user_repo;

pub use action_store::SqliteActionStore;
pub use area_repo::SqliteAreaRepo;
pub use credit_repo::SqliteCreditRepo;
pub use habit_repo::SqliteHabitRepo;
pub use log_repo::SqliteLogRepo;
pub use transaction_repo::SqliteTransactionRepo;
pub use user_repo::SqliteUserRepo;

/// Container for all SQLite repositories, sharing one pool.
pub struct SqliteRepositories {
    pub user: Arc<SqliteUserRepo>,
    pub area: Arc<SqliteAreaRepo>,
    pub habit: Arc<SqliteHabitRepo>,
    pub log: Arc<SqliteLogRepo>,
    pub credit: Arc<SqliteCreditRepo>,
    pub transaction: Arc<SqliteTransactionRepo>,
    pub action: Arc<SqliteActionStore>,
}

impl SqliteRepositories {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            user: Arc::new(SqliteUserRepo::new(pool.clone())),
            area: Arc::new(SqliteAreaRepo::new(pool.clone())),
            habit: Arc::new(SqliteHabitRepo::new(pool.clone())),
            log: Arc::new(SqliteLogRepo::new(pool.clone())),
            credit: Arc::new(SqliteCreditRepo::new(pool.clone())),
            transaction: Arc::new(SqliteTransactionRepo::new(pool.clone())),
            action: Arc::new(SqliteActionStore::new(pool)),
        }
    }
}

/// Create tables and indexes if they do not exist.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), RepoError> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            life INTEGER NOT NULL,
            max_life INTEGER NOT NULL,
            coins INTEGER NOT NULL,
            level INTEGER NOT NULL,
            xp INTEGER NOT NULL,
            xp_per_level INTEGER NOT NULL,
            level_curve TEXT NOT NULL,
            level_multiplier REAL NOT NULL,
            xp_mode TEXT NOT NULL,
            game_state TEXT NOT NULL,
            game_over_at TEXT,
            recovery_started_at TEXT,
            recovery_distance INTEGER NOT NULL,
            recovery_target INTEGER NOT NULL,
            total_game_overs INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS areas (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            icon TEXT NOT NULL,
            xp_per_level INTEGER NOT NULL,
            level_curve TEXT NOT NULL,
            level_multiplier REAL NOT NULL,
            status TEXT NOT NULL,
            archived_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS area_levels (
            user_id TEXT NOT NULL,
            area_id TEXT NOT NULL,
            level INTEGER NOT NULL,
            xp INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, area_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS good_habits (
            id TEXT PRIMARY KEY,
            area_id TEXT NOT NULL,
            name TEXT NOT NULL,
            xp_reward INTEGER NOT NULL,
            coin_reward INTEGER NOT NULL,
            cadence TEXT NOT NULL,
            is_active INTEGER NOT NULL,
            status TEXT NOT NULL,
            archived_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS bad_habits (
            id TEXT PRIMARY KEY,
            area_id TEXT,
            name TEXT NOT NULL,
            life_penalty INTEGER NOT NULL,
            controllable INTEGER NOT NULL,
            coin_cost INTEGER NOT NULL,
            is_active INTEGER NOT NULL,
            status TEXT NOT NULL,
            archived_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS habit_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            habit_id TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_habit_logs_user_ts
            ON habit_logs (user_id, timestamp)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS bad_habit_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            bad_habit_id TEXT NOT NULL,
            avoided_penalty INTEGER NOT NULL,
            timestamp TEXT NOT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_bad_habit_logs_user_ts
            ON bad_habit_logs (user_id, timestamp)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS credits (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            bad_habit_id TEXT NOT NULL,
            purchased_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_credits_user_habit
            ON credits (user_id, bad_habit_id, purchased_at)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            amount INTEGER NOT NULL,
            description TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| RepoError::database("ensure_schema", e))?;
    }

    Ok(())
}

// =============================================================================
// Row-mapping helpers
// =============================================================================

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(raw).map_err(|e| RepoError::serialization(format!("invalid uuid {raw}: {e}")))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::serialization(format!("invalid timestamp {raw}: {e}")))
}

pub(crate) fn parse_opt_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>, RepoError> {
    raw.map(|s| parse_timestamp(&s)).transpose()
}

pub(crate) fn parse_enum<T>(raw: &str) -> Result<T, RepoError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| RepoError::serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    use habitquest_domain::{
        apply_completion, Area, AreaLevel, BadHabit, BadHabitCredit, BadHabitLog, GameState,
        GoodHabit, HabitLog, LevelCurve, Transaction, User,
    };

    use crate::infrastructure::ports::{
        ActionStore, AreaRepo, BadHabitWrite, CompletionWrite, CreditPurchaseWrite, CreditRepo,
        HabitRepo, LogRepo, TransactionRepo, UserRepo, Versioned,
    };

    async fn test_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("test.db"))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("pool");
        ensure_schema(&pool).await.expect("schema");
        pool
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single().expect("valid time")
    }

    #[tokio::test]
    async fn user_rows_round_trip_and_reject_stale_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir).await;
        let repos = SqliteRepositories::new(pool);

        let user = User::new("Otto", now());
        repos.user.insert(&user).await.expect("insert");

        let loaded = repos
            .user
            .get(user.id)
            .await
            .expect("get")
            .expect("row exists");
        assert_eq!(loaded.value, user);
        assert_eq!(loaded.version, 0);

        let mut updated = loaded.clone();
        updated.value.add_coins(25);
        repos.user.update(&updated).await.expect("update at version 0");

        // The same read version cannot win twice.
        let second = repos.user.update(&updated).await;
        assert!(matches!(second, Err(e) if e.is_stale()));

        let reloaded = repos.user.get(user.id).await.expect("get").expect("row");
        assert_eq!(reloaded.value.coins, 25);
        assert_eq!(reloaded.version, 1);
    }

    #[tokio::test]
    async fn completion_commit_writes_the_whole_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir).await;
        let repos = SqliteRepositories::new(pool);

        let mut user = User::new("Otto", now());
        let area = Area::new("Fitness", "star", 100, LevelCurve::Linear, 1.0, now())
            .expect("valid area");
        let habit = GoodHabit::new(area.id, "Run", 30, 5, "daily", now()).expect("valid habit");

        repos.user.insert(&user).await.expect("insert user");
        repos.area.save(&area).await.expect("save area");
        repos.habit.save_good(&habit).await.expect("save habit");

        let mut area_level = AreaLevel::new(user.id, area.id);
        area_level.progress = apply_completion(
            area_level.progress,
            30,
            area.xp_per_level,
            area.level_curve,
            area.level_multiplier,
        );
        user.add_coins(5);

        let write = CompletionWrite {
            user: Versioned::new(user.clone(), 0),
            area_level,
            area_level_version: None,
            log: HabitLog::new(user.id, habit.id, now()),
            ledger: Transaction::earn(user.id, 5, "Completed Run", now()),
        };
        repos.action.commit_completion(write).await.expect("commit");

        let level = repos
            .area
            .get_level(user.id, area.id)
            .await
            .expect("get_level")
            .expect("row created");
        assert_eq!(level.value.progress.xp, 30);
        assert_eq!(level.version, 0);

        let logs = repos
            .log
            .good_completions_in(user.id, now(), now() + chrono::TimeDelta::hours(1))
            .await
            .expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(
            repos.log.total_reward_xp(user.id).await.expect("sum"),
            30,
            "lifetime sum joins the habit's reward"
        );

        let ledger = repos
            .transaction
            .list_for_user(user.id, 10)
            .await
            .expect("ledger");
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].amount, 5);
    }

    #[tokio::test]
    async fn credit_is_consumed_at_most_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir).await;
        let repos = SqliteRepositories::new(pool);

        let mut user = User::new("Otto", now());
        user.add_coins(100);
        let habit = BadHabit::new(None, "Smoking", 10, true, 50, now()).expect("valid habit");

        repos.user.insert(&user).await.expect("insert user");
        repos.habit.save_bad(&habit).await.expect("save habit");

        let mut buyer = user.clone();
        buyer.spend_coins(50).expect("spend");
        let credit = BadHabitCredit::new(user.id, habit.id, now());
        repos
            .action
            .commit_credit_purchase(CreditPurchaseWrite {
                user: Versioned::new(buyer, 0),
                credit,
                ledger: Transaction::spend(user.id, 50, "Credit for Smoking", now()),
            })
            .await
            .expect("purchase");

        let oldest = repos
            .credit
            .oldest_for(user.id, habit.id)
            .await
            .expect("oldest")
            .expect("credit exists");
        assert_eq!(oldest.id, credit.id);
        assert_eq!(repos.credit.count_for(user.id, habit.id).await.expect("count"), 1);

        let consume = |version: i64| BadHabitWrite {
            user: Versioned::new(user.clone(), version),
            consumed_credit: Some(credit.id),
            log: BadHabitLog::new(user.id, habit.id, true, now()),
            triggers_game_over: false,
        };

        repos
            .action
            .commit_bad_habit(consume(1))
            .await
            .expect("first consumption");
        let second = repos.action.commit_bad_habit(consume(2)).await;
        assert!(matches!(second, Err(e) if e.is_stale()));

        assert_eq!(repos.credit.count_for(user.id, habit.id).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn credits_are_consumed_oldest_purchase_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir).await;
        let repos = SqliteRepositories::new(pool);

        let mut user = User::new("Otto", now());
        user.add_coins(100);
        let habit = BadHabit::new(None, "Smoking", 10, true, 50, now()).expect("valid habit");

        repos.user.insert(&user).await.expect("insert user");
        repos.habit.save_bad(&habit).await.expect("save habit");

        // The newer credit lands in the table first; purchase order must not
        // beat purchase time.
        let newer = BadHabitCredit::new(user.id, habit.id, now() + chrono::TimeDelta::hours(2));
        let older = BadHabitCredit::new(user.id, habit.id, now());

        let mut buyer = user.clone();
        for (version, credit) in [(0, newer), (1, older)] {
            buyer.spend_coins(50).expect("spend");
            repos
                .action
                .commit_credit_purchase(CreditPurchaseWrite {
                    user: Versioned::new(buyer.clone(), version),
                    credit,
                    ledger: Transaction::spend(user.id, 50, "Credit for Smoking", now()),
                })
                .await
                .expect("purchase");
        }
        assert_eq!(repos.credit.count_for(user.id, habit.id).await.expect("count"), 2);

        let first = repos
            .credit
            .oldest_for(user.id, habit.id)
            .await
            .expect("oldest")
            .expect("credit exists");
        assert_eq!(first.id, older.id);

        repos
            .action
            .commit_bad_habit(BadHabitWrite {
                user: Versioned::new(user.clone(), 2),
                consumed_credit: Some(first.id),
                log: BadHabitLog::new(user.id, habit.id, true, now()),
                triggers_game_over: false,
            })
            .await
            .expect("consume");

        let remaining = repos
            .credit
            .oldest_for(user.id, habit.id)
            .await
            .expect("oldest")
            .expect("credit remains");
        assert_eq!(remaining.id, newer.id);
    }

    #[tokio::test]
    async fn game_over_transition_fires_at_most_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = test_pool(&dir).await;
        let repos = SqliteRepositories::new(pool);

        let mut user = User::new("Otto", now());
        user.life = 5;
        repos.user.insert(&user).await.expect("insert user");
        let habit = BadHabit::new(None, "Smoking", 10, false, 0, now()).expect("valid habit");
        repos.habit.save_bad(&habit).await.expect("save habit");

        let mut downed = user.clone();
        downed.apply_life_penalty(10);
        downed.trigger_game_over(now()).expect("trigger");

        let write = |version: i64| BadHabitWrite {
            user: Versioned::new(downed.clone(), version),
            consumed_credit: None,
            log: BadHabitLog::new(user.id, habit.id, false, now()),
            triggers_game_over: true,
        };

        repos
            .action
            .commit_bad_habit(write(0))
            .await
            .expect("first transition");

        // Even with the right version, the active-state guard blocks a
        // second transition.
        let second = repos.action.commit_bad_habit(write(1)).await;
        assert!(matches!(second, Err(e) if e.is_stale()));

        let reloaded = repos.user.get(user.id).await.expect("get").expect("row");
        assert_eq!(reloaded.value.game_state, GameState::GameOver);
        assert_eq!(reloaded.value.total_game_overs, 1);
    }
}
