pub mod category;
pub mod inventory_item;
pub mod permission;
pub mod price_history;
pub mod role;
pub mod role_permission;
pub mod sale;
pub mod sale_transaction;
pub mod stock_movement;
pub mod user;
