use questlog_core::calendar::CalendarEntry;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::AppContext;
use crate::error::ServiceError;
use crate::storage::repository::CalendarTask;

#[derive(Clone)]
pub struct CalendarService {
    ctx: Arc<AppContext>,
}

impl CalendarService {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Ordered by start time
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<CalendarTask>, ServiceError> {
        Ok(self.ctx.storage.calendar.list(user_id).await?)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        entry: CalendarEntry,
    ) -> Result<CalendarTask, ServiceError> {
        let entry = entry.validated()?;
        let created = self.ctx.storage.calendar.create(user_id, &entry).await?;
        debug!(%user_id, id = %created.id, category = %created.category, "calendar task created");
        Ok(created)
    }
}
