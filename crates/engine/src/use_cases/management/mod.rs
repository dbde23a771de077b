//! Management use cases - CRUD-style operations for users, areas, habits,
//! the credit shop, and the coin ledger.

use std::sync::Arc;

use serde::Serialize;

use habitquest_domain::{
    Area, AreaId, BadHabit, BadHabitCredit, BadHabitId, DomainError, GoodHabit, GoodHabitId,
    LevelCurve, Transaction, User, UserId,
};

use crate::infrastructure::ports::{
    ActionStore, AreaRepo, ClockPort, CreditPurchaseWrite, CreditRepo, HabitRepo, RepoError,
    TransactionRepo, UserRepo,
};
use crate::use_cases::MAX_ACTION_RETRIES;

#[derive(Debug, thiserror::Error)]
pub enum ManagementError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    #[error("Area not found")]
    AreaNotFound,
    #[error("Habit not found")]
    HabitNotFound,
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

// =============================================================================
// User bootstrap + ledger
// =============================================================================

pub struct UserCrud {
    users: Arc<dyn UserRepo>,
    transactions: Arc<dyn TransactionRepo>,
    clock: Arc<dyn ClockPort>,
}

impl UserCrud {
    pub fn new(
        users: Arc<dyn UserRepo>,
        transactions: Arc<dyn TransactionRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            users,
            transactions,
            clock,
        }
    }

    /// Bootstrap a fresh account with default settings.
    pub async fn create(&self, name: String) -> Result<User, ManagementError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("user name cannot be empty").into());
        }

        let user = User::new(name, self.clock.now());
        self.users.insert(&user).await?;

        tracing::info!(user_id = %user.id, "created user");
        Ok(user)
    }

    pub async fn transactions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Transaction>, ManagementError> {
        self.users
            .get(user_id)
            .await?
            .ok_or(ManagementError::UserNotFound(user_id))?;

        Ok(self.transactions.list_for_user(user_id, limit).await?)
    }
}

// =============================================================================
// Area CRUD
// =============================================================================

pub struct AreaCrud {
    areas: Arc<dyn AreaRepo>,
    clock: Arc<dyn ClockPort>,
}

impl AreaCrud {
    pub fn new(areas: Arc<dyn AreaRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self { areas, clock }
    }

    pub async fn create(
        &self,
        name: String,
        icon: String,
        xp_per_level: u32,
        level_curve: LevelCurve,
        level_multiplier: f64,
    ) -> Result<Area, ManagementError> {
        let area = Area::new(
            name,
            icon,
            xp_per_level,
            level_curve,
            level_multiplier,
            self.clock.now(),
        )?;
        self.areas.save(&area).await?;
        Ok(area)
    }

    pub async fn list(&self, include_archived: bool) -> Result<Vec<Area>, ManagementError> {
        Ok(self.areas.list(include_archived).await?)
    }

    pub async fn archive(&self, id: AreaId) -> Result<Area, ManagementError> {
        let mut area = self
            .areas
            .get(id)
            .await?
            .ok_or(ManagementError::AreaNotFound)?;
        area.archive(self.clock.now());
        self.areas.save(&area).await?;
        Ok(area)
    }

    pub async fn restore(&self, id: AreaId) -> Result<Area, ManagementError> {
        let mut area = self
            .areas
            .get(id)
            .await?
            .ok_or(ManagementError::AreaNotFound)?;
        area.restore();
        self.areas.save(&area).await?;
        Ok(area)
    }
}

// =============================================================================
// Habit CRUD
// =============================================================================

pub struct HabitCrud {
    areas: Arc<dyn AreaRepo>,
    habits: Arc<dyn HabitRepo>,
    clock: Arc<dyn ClockPort>,
}

impl HabitCrud {
    pub fn new(
        areas: Arc<dyn AreaRepo>,
        habits: Arc<dyn HabitRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            areas,
            habits,
            clock,
        }
    }

    pub async fn create_good(
        &self,
        area_id: AreaId,
        name: String,
        xp_reward: u32,
        coin_reward: u32,
        cadence: String,
    ) -> Result<GoodHabit, ManagementError> {
        let area = self
            .areas
            .get(area_id)
            .await?
            .ok_or(ManagementError::AreaNotFound)?;
        if area.is_archived() {
            return Err(DomainError::conflict("area is archived").into());
        }

        let habit = GoodHabit::new(area_id, name, xp_reward, coin_reward, cadence, self.clock.now())?;
        self.habits.save_good(&habit).await?;
        Ok(habit)
    }

    pub async fn list_good(&self, include_archived: bool) -> Result<Vec<GoodHabit>, ManagementError> {
        Ok(self.habits.list_good(include_archived).await?)
    }

    pub async fn archive_good(&self, id: GoodHabitId) -> Result<GoodHabit, ManagementError> {
        let mut habit = self
            .habits
            .get_good(id)
            .await?
            .ok_or(ManagementError::HabitNotFound)?;
        habit.archive(self.clock.now());
        self.habits.save_good(&habit).await?;
        Ok(habit)
    }

    pub async fn restore_good(&self, id: GoodHabitId) -> Result<GoodHabit, ManagementError> {
        let mut habit = self
            .habits
            .get_good(id)
            .await?
            .ok_or(ManagementError::HabitNotFound)?;
        habit.restore();
        self.habits.save_good(&habit).await?;
        Ok(habit)
    }

    pub async fn create_bad(
        &self,
        area_id: Option<AreaId>,
        name: String,
        life_penalty: u32,
        controllable: bool,
        coin_cost: u32,
    ) -> Result<BadHabit, ManagementError> {
        if let Some(area_id) = area_id {
            self.areas
                .get(area_id)
                .await?
                .ok_or(ManagementError::AreaNotFound)?;
        }

        let habit = BadHabit::new(
            area_id,
            name,
            life_penalty,
            controllable,
            coin_cost,
            self.clock.now(),
        )?;
        self.habits.save_bad(&habit).await?;
        Ok(habit)
    }

    pub async fn list_bad(&self, include_archived: bool) -> Result<Vec<BadHabit>, ManagementError> {
        Ok(self.habits.list_bad(include_archived).await?)
    }

    pub async fn archive_bad(&self, id: BadHabitId) -> Result<BadHabit, ManagementError> {
        let mut habit = self
            .habits
            .get_bad(id)
            .await?
            .ok_or(ManagementError::HabitNotFound)?;
        habit.archive(self.clock.now());
        self.habits.save_bad(&habit).await?;
        Ok(habit)
    }

    pub async fn restore_bad(&self, id: BadHabitId) -> Result<BadHabit, ManagementError> {
        let mut habit = self
            .habits
            .get_bad(id)
            .await?
            .ok_or(ManagementError::HabitNotFound)?;
        habit.restore();
        self.habits.save_bad(&habit).await?;
        Ok(habit)
    }
}

// =============================================================================
// Credit shop
// =============================================================================

/// Response payload for a credit purchase.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPurchaseResult {
    pub coins: u64,
    pub credit_count: u32,
}

/// Buy one bad-habit credit with coins. Conflict when the habit is not
/// controllable or the coin balance is short.
pub struct BuyCredit {
    users: Arc<dyn UserRepo>,
    habits: Arc<dyn HabitRepo>,
    credits: Arc<dyn CreditRepo>,
    actions: Arc<dyn ActionStore>,
    clock: Arc<dyn ClockPort>,
}

impl BuyCredit {
    pub fn new(
        users: Arc<dyn UserRepo>,
        habits: Arc<dyn HabitRepo>,
        credits: Arc<dyn CreditRepo>,
        actions: Arc<dyn ActionStore>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            users,
            habits,
            credits,
            actions,
            clock,
        }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        habit_id: BadHabitId,
    ) -> Result<CreditPurchaseResult, ManagementError> {
        let mut attempts = 0;

        loop {
            let mut user = self
                .users
                .get(user_id)
                .await?
                .ok_or(ManagementError::UserNotFound(user_id))?;

            let habit = self
                .habits
                .get_bad(habit_id)
                .await?
                .ok_or(ManagementError::HabitNotFound)?;
            if !habit.is_actionable() {
                return Err(ManagementError::HabitNotFound);
            }
            if !habit.controllable {
                return Err(DomainError::conflict("habit does not sell credits").into());
            }

            user.value.spend_coins(u64::from(habit.coin_cost))?;

            let now = self.clock.now();
            let credit = BadHabitCredit::new(user_id, habit_id, now);
            let ledger = Transaction::spend(
                user_id,
                u64::from(habit.coin_cost),
                format!("Credit for {}", habit.name),
                now,
            );

            let write = CreditPurchaseWrite {
                user: user.clone(),
                credit,
                ledger,
            };

            match self.actions.commit_credit_purchase(write).await {
                Ok(()) => {
                    let credit_count = self.credits.count_for(user_id, habit_id).await?;
                    return Ok(CreditPurchaseResult {
                        coins: user.value.coins,
                        credit_count,
                    });
                }
                Err(e) if e.is_stale() && attempts < MAX_ACTION_RETRIES => attempts += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
