use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{lifecycle::Role, models::Notification};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    #[sea_orm(string_value = "OFFER")]
    Offer,
    #[sea_orm(string_value = "ALERT")]
    Alert,
    #[sea_orm(string_value = "INFO")]
    Info,
    #[sea_orm(string_value = "DEAL")]
    Deal,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetAudience {
    #[sea_orm(string_value = "ALL")]
    All,
    #[sea_orm(string_value = "CUSTOMERS")]
    Customers,
    #[sea_orm(string_value = "DELIVERY")]
    Delivery,
}

impl TargetAudience {
    /// The role a recipient must have, or `None` when everyone receives it.
    pub fn role(&self) -> Option<Role> {
        match self {
            TargetAudience::All => None,
            TargetAudience::Customers => Some(Role::Customer),
            TargetAudience::Delivery => Some(Role::Delivery),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,
    #[sea_orm(string_value = "SENT")]
    Sent,
}

impl NotificationStatus {
    pub fn for_schedule(scheduled_for: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match scheduled_for {
            Some(at) if at > now => NotificationStatus::Scheduled,
            _ => NotificationStatus::Sent,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendNotificationRequest {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub target_audience: TargetAudience,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SentNotification {
    pub notification: Notification,
    pub recipients: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub items: Vec<Notification>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InboxEntry {
    pub id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub notification: Notification,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Inbox {
    pub items: Vec<InboxEntry>,
}
