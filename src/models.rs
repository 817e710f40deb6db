use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{
        delivery::{IssueStatus, IssueType},
        notifications::{NotificationKind, NotificationStatus, TargetAudience},
    },
    entity::{categories, delivery_issues, notifications, order_items, orders, products, stores, users},
    lifecycle::{Badge, OrderStatus, PaymentMethod, PaymentStatus, ReturnStatus, Role},
};

fn utc(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

/// A user as exposed over the API. Password hash and reset token never leave
/// the service layer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
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
    pub performance_badge: Option<Badge>,
    pub online_status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            role: model.role,
            name: model.name,
            phone: model.phone,
            profile_image_url: model.profile_image_url,
            vehicle_type: model.vehicle_type,
            vehicle_number: model.vehicle_number,
            is_available: model.is_available,
            current_location: model.current_location,
            rating: model.rating,
            total_deliveries: model.total_deliveries,
            total_earnings: model.total_earnings,
            performance_badge: model.performance_badge,
            online_status: model.online_status,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

impl From<stores::Model> for Store {
    fn from(model: stores::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            location: model.location,
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in cents.
    pub price: i64,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            category_id: model.category_id,
            store_id: model.store_id,
            image_url: model.image_url,
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub payment_received_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            delivery_address: model.delivery_address,
            status: model.status,
            subtotal: model.subtotal,
            tax: model.tax,
            total: model.total,
            promo_code: model.promo_code,
            payment_method: model.payment_method,
            payment_status: model.payment_status,
            delivery_person_id: model.delivery_person_id,
            delivery_notes: model.delivery_notes,
            cod_collected: model.cod_collected,
            delivery_proof_image_url: model.delivery_proof_image_url,
            cancelled_by: model.cancelled_by,
            cancel_reason: model.cancel_reason,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
            assigned_at: model.assigned_at.map(utc),
            picked_up_at: model.picked_up_at.map(utc),
            payment_received_at: model.payment_received_at.map(utc),
            delivered_at: model.delivered_at.map(utc),
            cancelled_at: model.cancelled_at.map(utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_purchase: i64,
    pub return_status: ReturnStatus,
    pub return_reason: Option<String>,
    pub return_description: Option<String>,
    pub return_requested_at: Option<DateTime<Utc>>,
    pub return_processed_at: Option<DateTime<Utc>>,
    pub refund_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price_at_purchase: model.price_at_purchase,
            return_status: model.return_status,
            return_reason: model.return_reason,
            return_description: model.return_description,
            return_requested_at: model.return_requested_at.map(utc),
            return_processed_at: model.return_processed_at.map(utc),
            refund_amount: model.refund_amount,
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub target_audience: TargetAudience,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            message: model.message,
            kind: model.kind,
            target_audience: model.target_audience,
            scheduled_for: model.scheduled_for.map(utc),
            status: model.status,
            created_at: utc(model.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryIssue {
    pub id: Uuid,
    pub order_id: Uuid,
    pub reported_by: Uuid,
    pub issue_type: IssueType,
    pub description: String,
    pub status: IssueStatus,
    pub reported_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<delivery_issues::Model> for DeliveryIssue {
    fn from(model: delivery_issues::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            reported_by: model.reported_by,
            issue_type: model.issue_type,
            description: model.description,
            status: model.status,
            reported_at: utc(model.reported_at),
            resolved_at: model.resolved_at.map(utc),
        }
    }
}
