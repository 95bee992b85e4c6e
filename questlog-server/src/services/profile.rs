//! Username, profession and avatar

use questlog_core::profile::{
    find_profession, validate_username, AvatarCustomization, PlayerProfile, Profession,
    PROFESSIONS,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::AppContext;
use crate::error::ServiceError;

#[derive(Clone)]
pub struct ProfileService {
    ctx: Arc<AppContext>,
}

impl ProfileService {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// A user without a row gets an empty profile
    pub async fn get(&self, user_id: Uuid) -> Result<PlayerProfile, ServiceError> {
        Ok(self
            .ctx
            .storage
            .profiles
            .get(user_id)
            .await?
            .unwrap_or_default())
    }

    pub async fn set_username(
        &self,
        user_id: Uuid,
        raw: &str,
    ) -> Result<PlayerProfile, ServiceError> {
        let username = validate_username(raw)?;
        let profile = self.ctx.storage.profiles.set_username(user_id, &username).await?;
        debug!(%user_id, %username, "username set");
        Ok(profile)
    }

    pub async fn set_profession(
        &self,
        user_id: Uuid,
        id: &str,
    ) -> Result<PlayerProfile, ServiceError> {
        let profession = find_profession(id)?;
        let profile = self
            .ctx
            .storage
            .profiles
            .set_profession(user_id, profession.id)
            .await?;
        debug!(%user_id, profession = profession.id, "profession set");
        Ok(profile)
    }

    pub async fn set_avatar(
        &self,
        user_id: Uuid,
        avatar: &AvatarCustomization,
    ) -> Result<PlayerProfile, ServiceError> {
        avatar.validate()?;
        Ok(self.ctx.storage.profiles.set_avatar(user_id, avatar).await?)
    }

    pub fn professions(&self) -> &'static [Profession] {
        PROFESSIONS
    }
}
