//! Notification preference repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, sea_query::Expr,
};

use crate::entities::notification_preference::{ActiveModel, Column, Entity, Model};
use foodtrack_common::{AppError, AppResult};

/// Repository for notification preference rows.
#[derive(Clone)]
pub struct NotificationPreferenceRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationPreferenceRepository {
    /// Create a new notification preference repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the preference row of a user.
    pub async fn find_by_user_id(&self, user_id: i64) -> AppResult<Option<Model>> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a preference row.
    pub async fn create(&self, model: ActiveModel) -> AppResult<Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a preference row.
    pub async fn update(&self, model: ActiveModel) -> AppResult<Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the master push switch without loading the row.
    /// Returns the number of rows touched (0 when the user has no row yet).
    pub async fn set_push_enabled(&self, user_id: i64, enabled: bool) -> AppResult<u64> {
        let now: sea_orm::entity::prelude::DateTimeWithTimeZone = Utc::now().into();

        let result = Entity::update_many()
            .filter(Column::UserId.eq(user_id))
            .col_expr(Column::PushEnabled, Expr::value(enabled))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_preference(user_id: i64) -> Model {
        Model {
            id: 1,
            user_id,
            meal_reminders: true,
            water_reminders: true,
            progress_updates: true,
            group_activity: true,
            weekly_reports: true,
            breakfast_time: "08:00".to_string(),
            lunch_time: "13:00".to_string(),
            dinner_time: "19:00".to_string(),
            push_enabled: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_user_id_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_preference(7)]])
                .into_connection(),
        );

        let repo = NotificationPreferenceRepository::new(db);
        let found = repo.find_by_user_id(7).await.unwrap();

        assert_eq!(found.map(|p| p.user_id), Some(7));
    }

    #[tokio::test]
    async fn test_find_by_user_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<Model>::new()])
                .into_connection(),
        );

        let repo = NotificationPreferenceRepository::new(db);
        assert!(repo.find_by_user_id(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_push_enabled_without_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = NotificationPreferenceRepository::new(db);
        assert_eq!(repo.set_push_enabled(7, false).await.unwrap(), 0);
    }
}
