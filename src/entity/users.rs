use sea_orm::entity::prelude::*;

use crate::lifecycle::{Badge, Role};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub phone: String,
    pub profile_image_url: Option<String>,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
    pub is_available: bool,
    pub current_location: Option<String>,
    pub rating: f64,
    pub total_deliveries: i32,
    pub total_earnings: i64,
    pub incentives: i64,
    pub bonus: i64,
    pub performance_badge: Option<Badge>,
    pub online_status: bool,
    pub last_online_at: Option<DateTimeWithTimeZone>,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::notification_logs::Entity")]
    NotificationLogs,
    #[sea_orm(has_many = "super::delivery_sessions::Entity")]
    DeliverySessions,
}

impl Related<super::notification_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NotificationLogs.def()
    }
}

impl Related<super::delivery_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliverySessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
