use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin as admin_dto, auth as auth_dto, catalog, delivery as delivery_dto,
        notifications as notification_dto, orders as order_dto, products as product_dto,
    },
    lifecycle::{Badge, OrderStatus, PaymentMethod, PaymentStatus, ReturnStatus, Role},
    models::{Category, DeliveryIssue, Notification, Order, OrderItem, Product, Store, User},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, categories, delivery, health, notifications, orders, params, products,
        stores,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::forgot_password,
        auth::reset_password,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        categories::list_categories,
        categories::create_category,
        stores::list_stores,
        stores::create_store,
        orders::list_orders,
        orders::place_order,
        orders::get_order,
        orders::update_notes,
        orders::cancel_order,
        orders::request_return,
        orders::process_return,
        delivery::my_orders,
        delivery::assign_order,
        delivery::update_status,
        delivery::upload_proof,
        delivery::report_issue,
        delivery::update_location,
        delivery::set_online_status,
        delivery::earnings_summary,
        delivery::list_delivery_persons,
        notifications::my_notifications,
        notifications::mark_read,
        admin::dashboard,
        admin::recent_orders,
        admin::unassigned_orders,
        admin::assigned_orders,
        admin::assign_order,
        admin::list_returns,
        admin::process_return,
        admin::sales_chart,
        admin::orders_by_status,
        admin::list_notifications,
        admin::send_notification,
        admin::create_product,
        admin::top_products,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::delivery_persons,
        admin::create_delivery_partner,
        admin::set_availability,
        admin::delivery_stats,
        admin::user_stats,
        admin::user_details,
        admin::update_user
    ),
    components(
        schemas(
            User,
            Store,
            Category,
            Product,
            Order,
            OrderItem,
            Notification,
            DeliveryIssue,
            Role,
            Badge,
            OrderStatus,
            PaymentStatus,
            PaymentMethod,
            ReturnStatus,
            Meta,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            auth_dto::RegisterRequest,
            auth_dto::LoginRequest,
            auth_dto::LoginResponse,
            auth_dto::ForgotPasswordRequest,
            auth_dto::ResetPasswordRequest,
            catalog::CreateStoreRequest,
            catalog::CreateCategoryRequest,
            catalog::StoreList,
            catalog::CategoryList,
            product_dto::CreateProductRequest,
            product_dto::UpdateProductRequest,
            product_dto::ProductList,
            order_dto::PlaceOrderRequest,
            order_dto::PlaceOrderItem,
            order_dto::NotesRequest,
            order_dto::CancelOrderRequest,
            order_dto::ReturnRequest,
            order_dto::ReturnStatusRequest,
            order_dto::OrderWithItems,
            order_dto::OrderList,
            order_dto::ReturnEntry,
            order_dto::ReturnList,
            delivery_dto::IssueType,
            delivery_dto::IssueStatus,
            delivery_dto::AssignOrderRequest,
            delivery_dto::UpdateStatusRequest,
            delivery_dto::ReportIssueRequest,
            delivery_dto::LocationRequest,
            delivery_dto::OnlineStatusRequest,
            delivery_dto::OnlineStatus,
            delivery_dto::EarningsPeriod,
            delivery_dto::EarningsSummary,
            delivery_dto::ProofUploaded,
            notification_dto::NotificationKind,
            notification_dto::TargetAudience,
            notification_dto::NotificationStatus,
            notification_dto::SendNotificationRequest,
            notification_dto::SentNotification,
            notification_dto::NotificationList,
            notification_dto::InboxEntry,
            notification_dto::Inbox,
            admin_dto::DashboardStats,
            admin_dto::TodayStats,
            admin_dto::SalesChart,
            admin_dto::StatusChart,
            admin_dto::AssignRequest,
            admin_dto::ProcessReturnRequest,
            admin_dto::TopProduct,
            admin_dto::TopProductList,
            admin_dto::InventoryAdjustRequest,
            admin_dto::UserList,
            admin_dto::UserStats,
            admin_dto::UserDetails,
            admin_dto::UpdateUserRequest,
            admin_dto::CreateDeliveryPartnerRequest,
            admin_dto::AvailabilityRequest,
            admin_dto::DeliveryStatsSummary,
            ApiResponse<Product>,
            ApiResponse<product_dto::ProductList>,
            ApiResponse<order_dto::OrderWithItems>,
            ApiResponse<order_dto::OrderList>,
            ApiResponse<User>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Products", description = "Product catalog"),
        (name = "Catalog", description = "Stores and categories"),
        (name = "Orders", description = "Order placement, cancellation and returns"),
        (name = "Delivery", description = "Delivery person workflow"),
        (name = "Notifications", description = "Notification inbox"),
        (name = "Admin", description = "Admin dashboard and management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
