use sea_orm::entity::prelude::*;

use crate::lifecycle::{OrderStatus, PaymentMethod, PaymentStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub subtotal: i64,
    pub tax: i64,
    pub total: i64,
    pub promo_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub delivery_person_id: Option<Uuid>,
    pub delivery_notes: Option<String>,
    pub cod_collected: bool,
    pub delivery_proof_image_url: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub assigned_at: Option<DateTimeWithTimeZone>,
    pub picked_up_at: Option<DateTimeWithTimeZone>,
    pub payment_received_at: Option<DateTimeWithTimeZone>,
    pub delivered_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::DeliveryPersonId",
        to = "super::users::Column::Id"
    )]
    DeliveryPerson,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::delivery_issues::Entity")]
    DeliveryIssues,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::delivery_issues::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryIssues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
