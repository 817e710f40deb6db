pub mod categories;
pub mod delivery_issues;
pub mod delivery_sessions;
pub mod notification_logs;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod stores;
pub mod users;

pub use categories::Entity as Categories;
pub use delivery_issues::Entity as DeliveryIssues;
pub use delivery_sessions::Entity as DeliverySessions;
pub use notification_logs::Entity as NotificationLogs;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use stores::Entity as Stores;
pub use users::Entity as Users;
