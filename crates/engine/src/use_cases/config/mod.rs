//! User configuration use cases.

use std::sync::Arc;

use habitquest_domain::{DomainError, UserConfig, UserId};

use crate::infrastructure::ports::{RepoError, UserRepo};
use crate::use_cases::MAX_ACTION_RETRIES;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

pub struct GetUserConfig {
    users: Arc<dyn UserRepo>,
}

impl GetUserConfig {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    pub async fn execute(&self, user_id: UserId) -> Result<UserConfig, ConfigError> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(ConfigError::UserNotFound(user_id))?;

        Ok(user.value.config())
    }
}

/// Apply a validated settings update. Switching the xp mode re-interprets
/// the level/xp view on the next read; nothing is rewritten.
pub struct UpdateUserConfig {
    users: Arc<dyn UserRepo>,
}

impl UpdateUserConfig {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        config: UserConfig,
    ) -> Result<UserConfig, ConfigError> {
        let mut attempts = 0;

        loop {
            let mut user = self
                .users
                .get(user_id)
                .await?
                .ok_or(ConfigError::UserNotFound(user_id))?;
            user.value.apply_config(config)?;

            match self.users.update(&user).await {
                Ok(()) => return Ok(user.value.config()),
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
    use habitquest_domain::{LevelCurve, User, XpComputationMode};

    use crate::infrastructure::ports::{MockUserRepo, Versioned};

    fn config(xp_per_level: u32) -> UserConfig {
        UserConfig {
            xp_per_level,
            level_curve: LevelCurve::Exponential,
            level_multiplier: 1.5,
            xp_mode: XpComputationMode::Logs,
            recovery_target: 10_000,
        }
    }

    #[tokio::test]
    async fn update_persists_valid_config() {
        let user = User::new("Otto", Utc::now());
        let user_id = user.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 0))));
        users
            .expect_update()
            .withf(|u| {
                u.value.xp_per_level == 150
                    && u.value.level_curve == LevelCurve::Exponential
                    && u.value.xp_mode == XpComputationMode::Logs
            })
            .returning(|_| Ok(()));

        let updated = UpdateUserConfig::new(Arc::new(users))
            .execute(user_id, config(150))
            .await
            .expect("valid update");

        assert_eq!(updated.xp_per_level, 150);
        assert_eq!(updated.recovery_target, 10_000);
    }

    #[tokio::test]
    async fn update_rejects_out_of_range_values() {
        let user = User::new("Otto", Utc::now());
        let user_id = user.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 0))));
        users.expect_update().times(0);

        let result = UpdateUserConfig::new(Arc::new(users))
            .execute(user_id, config(5))
            .await;

        assert!(matches!(
            result,
            Err(ConfigError::Domain(DomainError::Validation(_)))
        ));
    }
}
