pub mod auth;
pub mod categories;
pub mod health;
pub mod inventory;
pub mod reports;
pub mod sales;
pub mod users;
