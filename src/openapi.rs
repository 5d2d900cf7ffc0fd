use utoipa::OpenApi;

use crate::entities::sale::SaleStatus;
use crate::entities::stock_movement::MovementType;
use crate::errors::ErrorResponse;
use crate::handlers;
use crate::services::categories::CategoryInput;
use crate::services::inventory::{
    CreateItemInput, ItemDeletion, SortDirection, UpdateItemInput,
};
use crate::services::reports::{LowStockEntry, MarginEntry, SalesSummary};
use crate::services::sales::{CreateSaleInput, RefundLineInput, RefundSaleInput, SaleLineInput};
use crate::services::users::UserView;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        description = "Inventory ledger with RBAC and sales/refund flows",
        license(name = "MIT")
    ),
    paths(
        handlers::inventory::create_item,
        handlers::inventory::list_items,
        handlers::inventory::get_item,
        handlers::inventory::update_item,
        handlers::inventory::delete_item,
        handlers::inventory::add_stock,
        handlers::inventory::remove_stock,
        handlers::inventory::adjust_stock,
        handlers::inventory::update_location,
        handlers::inventory::update_min_level,
        handlers::inventory::price_history,
        handlers::inventory::list_movements,
        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::get_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::sales::create_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,
        handlers::sales::refund_sale,
        handlers::sales::cancel_sale,
        handlers::users::list_users,
        handlers::users::assign_role,
        handlers::auth::sync_user,
        handlers::auth::me,
        handlers::reports::low_stock,
        handlers::reports::margins,
        handlers::reports::sales_summary,
        handlers::health::health,
        handlers::health::liveness,
        handlers::health::readiness,
    ),
    components(schemas(
        ErrorResponse,
        CreateItemInput,
        UpdateItemInput,
        ItemDeletion,
        SortDirection,
        MovementType,
        SaleStatus,
        CategoryInput,
        CreateSaleInput,
        SaleLineInput,
        RefundSaleInput,
        RefundLineInput,
        UserView,
        LowStockEntry,
        MarginEntry,
        SalesSummary,
        handlers::inventory::StockChangeRequest,
        handlers::inventory::UpdateLocationRequest,
        handlers::inventory::UpdateMinLevelRequest,
        handlers::users::AssignRoleRequest,
        handlers::health::HealthStatus,
    )),
    tags(
        (name = "inventory", description = "Inventory ledger operations"),
        (name = "categories", description = "Category management"),
        (name = "sales", description = "Sales, refunds and cancellations"),
        (name = "users", description = "User and role administration"),
        (name = "auth", description = "Identity bridge"),
        (name = "reports", description = "Reporting queries"),
        (name = "health", description = "Service health probes"),
    )
)]
pub struct ApiDoc;

pub fn api_doc() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_builds_and_covers_core_routes() {
        let doc = api_doc();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/api/v1/inventory/{id}/add-stock"));
        assert!(json.contains("/api/v1/sales/{id}/refund"));
        assert!(json.contains("/health/ready"));
    }
}
