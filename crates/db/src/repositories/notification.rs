//! Notification repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
    sea_query::Expr,
};

use crate::entities::{Notification, notification};
use foodtrack_common::{AppError, AppResult};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new notification.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a notification owned by `user_id`.
    pub async fn find_owned(
        &self,
        id: i64,
        user_id: i64,
    ) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .filter(notification::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get one page (1-based) of a user's notifications, newest first,
    /// together with the user's total notification count.
    ///
    /// Pages past the last one are empty and never reach the row query.
    pub async fn find_page(
        &self,
        user_id: i64,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<notification::Model>, u64)> {
        let per_page = per_page.max(1);
        let paginator = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .paginate(self.db.as_ref(), per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if page == 0 || page > total.div_ceil(per_page) {
            return Ok((Vec::new(), total));
        }

        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((items, total))
    }

    /// Flip a notification to read, stamping `read_at`.
    pub async fn mark_as_read(&self, model: notification::Model) -> AppResult<notification::Model> {
        let mut active: notification::ActiveModel = model.into();
        active.is_read = Set(true);
        active.read_at = Set(Some(Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark all unread notifications of a user as read.
    ///
    /// Rows that are already read keep their original `read_at`.
    pub async fn mark_all_as_read(&self, user_id: i64) -> AppResult<u64> {
        let now: sea_orm::entity::prelude::DateTimeWithTimeZone = Utc::now().into();

        let result = Notification::update_many()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .col_expr(notification::Column::ReadAt, Expr::value(now))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Record whether Web Push delivery succeeded for a notification.
    pub async fn set_pushed(&self, id: i64, pushed: bool) -> AppResult<()> {
        Notification::update_many()
            .filter(notification::Column::Id.eq(id))
            .col_expr(notification::Column::IsPushed, Expr::value(pushed))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a notification owned by `user_id`. Returns the number of rows removed.
    pub async fn delete_owned(&self, id: i64, user_id: i64) -> AppResult<u64> {
        let result = Notification::delete_many()
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: i64) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
