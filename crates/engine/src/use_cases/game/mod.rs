//! Game lifecycle use cases: state view, recovery progress, recovery
//! completion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use habitquest_domain::{DomainError, GameState, User, UserId};

use crate::infrastructure::ports::{RepoError, UserRepo};
use crate::use_cases::MAX_ACTION_RETRIES;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

/// API shape of the game lifecycle state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub game_state: GameState,
    pub life: i64,
    pub max_life: i64,
    pub game_over_at: Option<DateTime<Utc>>,
    pub recovery_started_at: Option<DateTime<Utc>>,
    pub recovery_distance: u32,
    pub recovery_target: u32,
    pub recovery_complete: bool,
    pub total_game_overs: u32,
}

impl GameStateView {
    fn from_user(user: &User) -> Self {
        Self {
            game_state: user.game_state,
            life: user.life,
            max_life: user.max_life,
            game_over_at: user.game_over_at,
            recovery_started_at: user.recovery_started_at,
            recovery_distance: user.recovery_distance,
            recovery_target: user.recovery_target,
            recovery_complete: user.recovery_complete(),
            total_game_overs: user.total_game_overs,
        }
    }
}

pub struct GetGameState {
    users: Arc<dyn UserRepo>,
}

impl GetGameState {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    pub async fn execute(&self, user_id: UserId) -> Result<GameStateView, GameError> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(GameError::UserNotFound(user_id))?;

        Ok(GameStateView::from_user(&user.value))
    }
}

/// Store externally-reported recovery distance (meters). Rejected while the
/// game is active; never changes the game state by itself.
pub struct SetRecoveryProgress {
    users: Arc<dyn UserRepo>,
}

impl SetRecoveryProgress {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        meters: u32,
    ) -> Result<GameStateView, GameError> {
        let mut attempts = 0;

        loop {
            let mut user = self
                .users
                .get(user_id)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;
            user.value.set_recovery_progress(meters)?;

            match self.users.update(&user).await {
                Ok(()) => return Ok(GameStateView::from_user(&user.value)),
                Err(e) if e.is_stale() && attempts < MAX_ACTION_RETRIES => attempts += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Close out the recovery challenge: restores life and returns to active.
/// Conflict if the game is already active or the target is unreached.
pub struct CompleteRecovery {
    users: Arc<dyn UserRepo>,
}

impl CompleteRecovery {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    pub async fn execute(&self, user_id: UserId) -> Result<GameStateView, GameError> {
        let mut attempts = 0;

        loop {
            let mut user = self
                .users
                .get(user_id)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;
            user.value.complete_recovery()?;

            match self.users.update(&user).await {
                Ok(()) => return Ok(GameStateView::from_user(&user.value)),
                Err(e) if e.is_stale() && attempts < MAX_ACTION_RETRIES => attempts += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use habitquest_domain::DEFAULT_RECOVERY_TARGET;

    use crate::infrastructure::ports::{MockUserRepo, Versioned};

    fn game_over_user() -> User {
        let mut user = User::new("Otto", Utc::now());
        user.life = 0;
        user.trigger_game_over(Utc::now()).expect("trigger");
        user
    }

    #[tokio::test]
    async fn recovery_progress_is_stored_while_game_over() {
        let user = game_over_user();
        let user_id = user.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 1))));
        users
            .expect_update()
            .withf(|u| u.value.recovery_distance == 10_000 && u.version == 1)
            .returning(|_| Ok(()));

        let view = SetRecoveryProgress::new(Arc::new(users))
            .execute(user_id, 10_000)
            .await
            .expect("progress stored");

        assert_eq!(view.recovery_distance, 10_000);
        assert!(!view.recovery_complete);
        assert_eq!(view.game_state, GameState::GameOver);
    }

    #[tokio::test]
    async fn recovery_progress_rejected_while_active() {
        let user = User::new("Otto", Utc::now());
        let user_id = user.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 0))));
        users.expect_update().times(0);

        let result = SetRecoveryProgress::new(Arc::new(users))
            .execute(user_id, 5000)
            .await;

        assert!(matches!(
            result,
            Err(GameError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn complete_recovery_restores_life() {
        let mut user = game_over_user();
        user.recovery_distance = DEFAULT_RECOVERY_TARGET;
        let user_id = user.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 2))));
        users
            .expect_update()
            .withf(|u| {
                u.value.game_state == GameState::Active
                    && u.value.life == u.value.max_life
                    && u.value.game_over_at.is_none()
            })
            .returning(|_| Ok(()));

        let view = CompleteRecovery::new(Arc::new(users))
            .execute(user_id)
            .await
            .expect("recovery completes");

        assert_eq!(view.game_state, GameState::Active);
        assert_eq!(view.life, view.max_life);
    }

    #[tokio::test]
    async fn complete_recovery_short_of_target_conflicts() {
        let mut user = game_over_user();
        user.recovery_distance = 100;
        let user_id = user.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 0))));
        users.expect_update().times(0);

        let result = CompleteRecovery::new(Arc::new(users)).execute(user_id).await;
        assert!(matches!(
            result,
            Err(GameError::Domain(DomainError::Conflict(_)))
        ));
    }
}
