use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    lifecycle::{OrderStatus, ReturnStatus},
    models::{Product, User},
    routes::params::Pagination,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_revenue: i64,
    pub total_orders: i64,
    pub total_customers: i64,
    pub pending_returns: i64,
    pub today: TodayStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayStats {
    pub sales: i64,
    pub orders: i64,
    pub customers: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

impl LimitQuery {
    pub fn normalize(&self) -> u64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SalesChartQuery {
    pub days: Option<i64>,
}

impl SalesChartQuery {
    pub fn normalize(&self) -> i64 {
        self.days.unwrap_or(7).clamp(1, 90)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesChart {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusChart {
    pub labels: Vec<OrderStatus>,
    pub values: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRequest {
    pub delivery_person_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessReturnRequest {
    pub action: ReturnStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProduct {
    pub product: Product,
    pub sales_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProductList {
    pub items: Vec<TopProduct>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub threshold: Option<i32>,
}

impl LowStockQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold.unwrap_or(10).max(0)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserStats {
    pub by_role: BTreeMap<String, i64>,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetails {
    pub user: User,
    /// Present for delivery persons only.
    pub completed_deliveries: Option<i64>,
    pub active_deliveries: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
    pub is_available: Option<bool>,
    pub current_location: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDeliveryPartnerRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryStatsSummary {
    pub total_delivery_persons: i64,
    pub available_delivery_persons: i64,
    pub average_rating: f64,
    pub total_deliveries: i64,
}
