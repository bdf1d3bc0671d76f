//! Push subscription repository.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

use crate::entities::push_subscription::{ActiveModel, Column, Entity, Model};
use foodtrack_common::{AppError, AppResult};

/// Repository for push subscription operations.
#[derive(Clone)]
pub struct PushSubscriptionRepository {
    db: Arc<DatabaseConnection>,
}

impl PushSubscriptionRepository {
    /// Create a new push subscription repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a push subscription by endpoint.
    pub async fn find_by_endpoint(&self, endpoint: &str) -> AppResult<Option<Model>> {
        Entity::find()
            .filter(Column::Endpoint.eq(endpoint))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find all subscriptions for a user.
    pub async fn find_by_user_id(&self, user_id: i64) -> AppResult<Vec<Model>> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_asc(Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new push subscription.
    pub async fn create(&self, subscription: ActiveModel) -> AppResult<Model> {
        subscription
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a push subscription.
    pub async fn update(&self, subscription: ActiveModel) -> AppResult<Model> {
        subscription
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a push subscription.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete one of a user's subscriptions by endpoint.
    pub async fn delete_by_user_and_endpoint(&self, user_id: i64, endpoint: &str) -> AppResult<u64> {
        let result = Entity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Endpoint.eq(endpoint))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete all subscriptions for a user.
    pub async fn delete_by_user(&self, user_id: i64) -> AppResult<u64> {
        let result = Entity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Count subscriptions for a user.
    pub async fn count_by_user(&self, user_id: i64) -> AppResult<u64> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
