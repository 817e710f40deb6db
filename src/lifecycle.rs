//! Order lifecycle rules.
//!
//! Everything in here is free of I/O: services load rows, ask these types
//! whether a change is allowed, and persist the result.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Tax applied on the order subtotal, in percent.
pub const TAX_RATE_PERCENT: i64 = 13;

/// Flat fee credited to the delivery person per delivered order, in cents.
pub const DELIVERY_FEE: i64 = 5_000;

/// Days after delivery during which an item may be returned.
pub const RETURN_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    #[error("Order cannot be {action} at current status: {current}")]
    InvalidTransition {
        action: &'static str,
        current: OrderStatus,
    },

    #[error("Unsupported status: {0}")]
    UnsupportedStatus(String),

    #[error("items required")]
    EmptyOrder,

    #[error("quantity must be > 0")]
    InvalidQuantity,

    #[error("Not enough stock for: {product}")]
    InsufficientStock { product: String },

    #[error("Return already requested for this item")]
    ReturnAlreadyRequested,

    #[error("Can only return delivered items")]
    NotDelivered,

    #[error("Item not yet delivered")]
    MissingDeliveryTime,

    #[error("Return period ({RETURN_WINDOW_DAYS} days) has expired")]
    ReturnWindowExpired,

    #[error("Return cannot move from {current} to {target}")]
    InvalidReturnTransition {
        current: ReturnStatus,
        target: ReturnStatus,
    },
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PLACED")]
    Placed,
    #[sea_orm(string_value = "ASSIGNED")]
    Assigned,
    #[sea_orm(string_value = "PICKED_UP")]
    PickedUp,
    #[sea_orm(string_value = "PAYMENT_RECEIVED")]
    PaymentReceived,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Placed,
        OrderStatus::Assigned,
        OrderStatus::PickedUp,
        OrderStatus::PaymentReceived,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Assigned => "ASSIGNED",
            OrderStatus::PickedUp => "PICKED_UP",
            OrderStatus::PaymentReceived => "PAYMENT_RECEIVED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Validates `transition` against the current status and returns the
    /// status the order moves to.
    pub fn apply(self, transition: Transition) -> Result<OrderStatus, LifecycleError> {
        if transition.allowed_from().contains(&self) {
            Ok(transition.target())
        } else {
            Err(LifecycleError::InvalidTransition {
                action: transition.verb(),
                current: self,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LifecycleError::UnsupportedStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Assign,
    Pickup,
    ConfirmPayment,
    Deliver,
    Cancel,
}

impl Transition {
    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::Assign => OrderStatus::Assigned,
            Transition::Pickup => OrderStatus::PickedUp,
            Transition::ConfirmPayment => OrderStatus::PaymentReceived,
            Transition::Deliver => OrderStatus::Delivered,
            Transition::Cancel => OrderStatus::Cancelled,
        }
    }

    pub fn allowed_from(&self) -> &'static [OrderStatus] {
        match self {
            // ASSIGNED -> ASSIGNED is a hand-over to another delivery person.
            Transition::Assign => &[OrderStatus::Placed, OrderStatus::Assigned],
            Transition::Pickup => &[OrderStatus::Assigned],
            Transition::ConfirmPayment => &[OrderStatus::PickedUp],
            Transition::Deliver => &[OrderStatus::PaymentReceived],
            Transition::Cancel => &[OrderStatus::Placed, OrderStatus::Assigned],
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Transition::Assign => "assigned",
            Transition::Pickup => "picked up",
            Transition::ConfirmPayment => "marked as paid",
            Transition::Deliver => "delivered",
            Transition::Cancel => "cancelled",
        }
    }

    /// Maps a status requested by a delivery person onto the transition that
    /// reaches it. Only the delivery-side steps are accepted.
    pub fn for_delivery_update(status: OrderStatus) -> Result<Transition, LifecycleError> {
        match status {
            OrderStatus::PickedUp => Ok(Transition::Pickup),
            OrderStatus::PaymentReceived => Ok(Transition::ConfirmPayment),
            OrderStatus::Delivered => Ok(Transition::Deliver),
            other => Err(LifecycleError::UnsupportedStatus(other.to_string())),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    #[sea_orm(string_value = "COD")]
    Cod,
    #[sea_orm(string_value = "CARD")]
    Card,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnStatus {
    #[sea_orm(string_value = "NONE")]
    #[serde(rename = "NONE")]
    NotRequested,
    #[sea_orm(string_value = "REQUESTED")]
    Requested,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::NotRequested => "NONE",
            ReturnStatus::Requested => "REQUESTED",
            ReturnStatus::Approved => "APPROVED",
            ReturnStatus::Rejected => "REJECTED",
            ReturnStatus::Refunded => "REFUNDED",
        }
    }

    /// Admin decision on a return. A request may be approved, rejected or
    /// refunded outright; an approved return may still be refunded.
    pub fn process(self, target: ReturnStatus) -> Result<ReturnStatus, LifecycleError> {
        let allowed = matches!(
            (self, target),
            (
                ReturnStatus::Requested,
                ReturnStatus::Approved | ReturnStatus::Rejected | ReturnStatus::Refunded
            ) | (ReturnStatus::Approved, ReturnStatus::Refunded)
        );
        if allowed {
            Ok(target)
        } else {
            Err(LifecycleError::InvalidReturnTransition {
                current: self,
                target,
            })
        }
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReturnStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(ReturnStatus::NotRequested),
            "REQUESTED" => Ok(ReturnStatus::Requested),
            "APPROVED" => Ok(ReturnStatus::Approved),
            "REJECTED" => Ok(ReturnStatus::Rejected),
            "REFUNDED" => Ok(ReturnStatus::Refunded),
            other => Err(LifecycleError::UnsupportedStatus(other.to_string())),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "CUSTOMER")]
    Customer,
    #[sea_orm(string_value = "DELIVERY")]
    Delivery,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Delivery => "DELIVERY",
            Role::Admin => "ADMIN",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Badge {
    #[sea_orm(string_value = "BRONZE")]
    Bronze,
    #[sea_orm(string_value = "SILVER")]
    Silver,
    #[sea_orm(string_value = "GOLD")]
    Gold,
}

impl Badge {
    pub fn for_stats(total_deliveries: i32, rating: f64) -> Option<Badge> {
        if total_deliveries >= 100 && rating >= 4.5 {
            Some(Badge::Gold)
        } else if total_deliveries >= 50 && rating >= 4.0 {
            Some(Badge::Silver)
        } else if total_deliveries >= 10 {
            Some(Badge::Bronze)
        } else {
            None
        }
    }
}

/// Aggregate counters kept on a delivery person.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryStats {
    pub total_deliveries: i32,
    pub total_earnings: i64,
    pub rating: f64,
}

impl DeliveryStats {
    /// Credits one completed delivery and returns the recomputed badge.
    pub fn record_delivery(&mut self) -> Option<Badge> {
        self.total_deliveries += 1;
        self.total_earnings += DELIVERY_FEE;
        Badge::for_stats(self.total_deliveries, self.rating)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub tax: i64,
    pub total: i64,
}

impl OrderTotals {
    /// Totals for `(unit_price, quantity)` lines.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (i64, i32)>,
    {
        let subtotal = lines
            .into_iter()
            .map(|(price, quantity)| price * i64::from(quantity))
            .sum();
        Self::from_subtotal(subtotal)
    }

    pub fn from_subtotal(subtotal: i64) -> Self {
        let tax = tax_for(subtotal);
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

/// 13% of `subtotal`, rounded half-up to the cent.
pub fn tax_for(subtotal: i64) -> i64 {
    (subtotal * TAX_RATE_PERCENT + 50).div_euclid(100)
}

/// Remaining stock after taking `quantity` units, or the reason it can't be taken.
pub fn reserve_stock(product: &str, stock: i32, quantity: i32) -> Result<i32, LifecycleError> {
    if quantity <= 0 {
        return Err(LifecycleError::InvalidQuantity);
    }
    if stock < quantity {
        return Err(LifecycleError::InsufficientStock {
            product: product.to_string(),
        });
    }
    Ok(stock - quantity)
}

pub fn ensure_returnable(
    return_status: ReturnStatus,
    order_status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    if return_status != ReturnStatus::NotRequested {
        return Err(LifecycleError::ReturnAlreadyRequested);
    }
    if order_status != OrderStatus::Delivered {
        return Err(LifecycleError::NotDelivered);
    }
    let delivered_at = delivered_at.ok_or(LifecycleError::MissingDeliveryTime)?;
    if now > delivered_at + Duration::days(RETURN_WINDOW_DAYS) {
        return Err(LifecycleError::ReturnWindowExpired);
    }
    Ok(())
}

pub fn refund_amount(price_at_purchase: i64, quantity: i32) -> i64 {
    price_at_purchase * i64::from(quantity)
}
