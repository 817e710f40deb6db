use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    lifecycle::{PaymentMethod, ReturnStatus},
    models::{Order, OrderItem},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub delivery_address: String,
    pub items: Vec<PlaceOrderItem>,
    pub payment_method: Option<PaymentMethod>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlaceOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NotesRequest {
    pub notes: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnRequest {
    pub reason: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnStatusRequest {
    pub status: ReturnStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// A return request joined with the customer and product it concerns.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnEntry {
    pub item_id: Uuid,
    pub order_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: i64,
    pub return_status: ReturnStatus,
    pub return_reason: Option<String>,
    pub return_requested_at: Option<DateTime<Utc>>,
    pub refund_amount: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnList {
    pub items: Vec<ReturnEntry>,
}
