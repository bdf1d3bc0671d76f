//! Notification preferences and the push gate.

use chrono::{NaiveTime, Utc};
use foodtrack_common::AppResult;
use foodtrack_db::{
    entities::{
        notification::NotificationCategory,
        notification_preference::{
            self, DEFAULT_BREAKFAST_TIME, DEFAULT_DINNER_TIME, DEFAULT_LUNCH_TIME,
        },
    },
    repositories::NotificationPreferenceRepository,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Partial preference update. Absent keys are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesInput {
    pub meal_reminders: Option<bool>,
    pub water_reminders: Option<bool>,
    pub progress_updates: Option<bool>,
    pub group_activity: Option<bool>,
    pub weekly_reports: Option<bool>,
    #[validate(custom(function = "validate_time_of_day"))]
    pub breakfast_time: Option<String>,
    #[validate(custom(function = "validate_time_of_day"))]
    pub lunch_time: Option<String>,
    #[validate(custom(function = "validate_time_of_day"))]
    pub dinner_time: Option<String>,
    pub push_enabled: Option<bool>,
}

/// Accepts `HH:MM` in 24-hour form.
fn validate_time_of_day(value: &str) -> Result<(), ValidationError> {
    // Zero-padded only, so stored values keep one shape.
    let valid = value.len() == 5 && NaiveTime::parse_from_str(value, "%H:%M").is_ok();

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("time_of_day"))
    }
}

/// Client-facing preference shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesView {
    pub meal_reminders: bool,
    pub water_reminders: bool,
    pub progress_updates: bool,
    pub group_activity: bool,
    pub weekly_reports: bool,
    pub breakfast_time: String,
    pub lunch_time: String,
    pub dinner_time: String,
    pub push_enabled: bool,
}

impl From<&notification_preference::Model> for PreferencesView {
    fn from(model: &notification_preference::Model) -> Self {
        Self {
            meal_reminders: model.meal_reminders,
            water_reminders: model.water_reminders,
            progress_updates: model.progress_updates,
            group_activity: model.group_activity,
            weekly_reports: model.weekly_reports,
            breakfast_time: model.breakfast_time.clone(),
            lunch_time: model.lunch_time.clone(),
            dinner_time: model.dinner_time.clone(),
            push_enabled: model.push_enabled,
        }
    }
}

/// Whether a category may be pushed under the given preferences.
///
/// `friend`, `fridge` and `system` ignore the stored toggles.
#[must_use]
pub const fn is_category_enabled(
    preference: &notification_preference::Model,
    category: NotificationCategory,
) -> bool {
    match category {
        NotificationCategory::MealReminder => preference.meal_reminders,
        NotificationCategory::WaterReminder => preference.water_reminders,
        NotificationCategory::Progress => preference.progress_updates,
        NotificationCategory::Group => preference.group_activity,
        NotificationCategory::WeeklyReport => preference.weekly_reports,
        NotificationCategory::Friend | NotificationCategory::Fridge | NotificationCategory::System => {
            true
        }
    }
}

/// Push decision for one notification. Fails closed when no row exists.
#[must_use]
pub fn should_push(
    preference: Option<&notification_preference::Model>,
    user_id: i64,
    category: NotificationCategory,
) -> bool {
    let Some(preference) = preference else {
        tracing::debug!(user_id, %category, "No notification preferences, skipping push");
        return false;
    };

    if !preference.push_enabled {
        tracing::debug!(user_id, %category, "Push disabled by user, skipping push");
        return false;
    }

    if !is_category_enabled(preference, category) {
        tracing::debug!(user_id, %category, "Category disabled by user, skipping push");
        return false;
    }

    true
}

fn default_preferences(user_id: i64, push_enabled: bool) -> notification_preference::ActiveModel {
    notification_preference::ActiveModel {
        user_id: Set(user_id),
        meal_reminders: Set(true),
        water_reminders: Set(true),
        progress_updates: Set(true),
        group_activity: Set(true),
        weekly_reports: Set(true),
        breakfast_time: Set(DEFAULT_BREAKFAST_TIME.to_string()),
        lunch_time: Set(DEFAULT_LUNCH_TIME.to_string()),
        dinner_time: Set(DEFAULT_DINNER_TIME.to_string()),
        push_enabled: Set(push_enabled),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
        ..Default::default()
    }
}

/// Preference service.
#[derive(Clone)]
pub struct PreferenceService {
    repo: NotificationPreferenceRepository,
}

impl PreferenceService {
    /// Create a new preference service.
    #[must_use]
    pub const fn new(repo: NotificationPreferenceRepository) -> Self {
        Self { repo }
    }

    /// Load preferences without creating them.
    pub async fn find(&self, user_id: i64) -> AppResult<Option<notification_preference::Model>> {
        self.repo.find_by_user_id(user_id).await
    }

    /// Load preferences, inserting the defaults on first access.
    pub async fn get_or_create(&self, user_id: i64) -> AppResult<notification_preference::Model> {
        if let Some(existing) = self.repo.find_by_user_id(user_id).await? {
            return Ok(existing);
        }

        tracing::debug!(user_id, "Creating default notification preferences");
        self.repo.create(default_preferences(user_id, false)).await
    }

    /// Apply a partial update.
    pub async fn update(
        &self,
        user_id: i64,
        input: UpdatePreferencesInput,
    ) -> AppResult<notification_preference::Model> {
        input.validate()?;

        let current = self.get_or_create(user_id).await?;
        let mut active: notification_preference::ActiveModel = current.into();

        if let Some(v) = input.meal_reminders {
            active.meal_reminders = Set(v);
        }
        if let Some(v) = input.water_reminders {
            active.water_reminders = Set(v);
        }
        if let Some(v) = input.progress_updates {
            active.progress_updates = Set(v);
        }
        if let Some(v) = input.group_activity {
            active.group_activity = Set(v);
        }
        if let Some(v) = input.weekly_reports {
            active.weekly_reports = Set(v);
        }
        if let Some(v) = input.breakfast_time {
            active.breakfast_time = Set(v);
        }
        if let Some(v) = input.lunch_time {
            active.lunch_time = Set(v);
        }
        if let Some(v) = input.dinner_time {
            active.dinner_time = Set(v);
        }
        if let Some(v) = input.push_enabled {
            active.push_enabled = Set(v);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.repo.update(active).await
    }

    /// Turn the master push switch on, creating the row if needed.
    pub async fn enable_push(&self, user_id: i64) -> AppResult<()> {
        if self.repo.set_push_enabled(user_id, true).await? == 0 {
            self.repo.create(default_preferences(user_id, true)).await?;
        }
        Ok(())
    }

    /// Turn the master push switch off. A missing row stays missing.
    pub async fn disable_push(&self, user_id: i64) -> AppResult<()> {
        self.repo.set_push_enabled(user_id, false).await?;
        Ok(())
    }
}
