use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::lifecycle::{Badge, OrderStatus};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    #[sea_orm(string_value = "WRONG_ITEM")]
    WrongItem,
    #[sea_orm(string_value = "DAMAGED")]
    Damaged,
    #[sea_orm(string_value = "ADDRESS_ISSUE")]
    AddressIssue,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "RESOLVED")]
    Resolved,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignOrderRequest {
    pub order_id: Uuid,
    pub delivery_person_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    /// Only read when confirming payment.
    pub cod_collected: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportIssueRequest {
    pub order_id: Uuid,
    pub issue_type: IssueType,
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationRequest {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn as_location(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OnlineStatusRequest {
    pub online: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OnlineStatus {
    pub online: bool,
    pub last_online_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EarningsPeriod {
    Daily,
    Weekly,
}

impl EarningsPeriod {
    /// Start of the reporting window ending at `now`: midnight today for
    /// daily, midnight six days ago for weekly (seven calendar days).
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);
        match self {
            EarningsPeriod::Daily => midnight,
            EarningsPeriod::Weekly => midnight - Duration::days(6),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EarningsQuery {
    pub period: EarningsPeriod,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EarningsSummary {
    pub period: EarningsPeriod,
    pub total_deliveries: i64,
    pub total_earnings: i64,
    pub incentives: i64,
    pub bonus: i64,
    pub performance_badge: Option<Badge>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProofUploaded {
    pub image_url: String,
}
