pub mod admin;
pub mod auth;
pub mod catalog;
pub mod delivery;
pub mod notifications;
pub mod orders;
pub mod products;
