use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::RoleCatalog;
use crate::events::EventSender;

pub mod categories;
pub mod inventory;
pub mod reports;
pub mod sales;
pub mod users;

pub use categories::CategoryService;
pub use inventory::InventoryService;
pub use reports::ReportService;
pub use sales::SalesService;
pub use users::UserService;

/// Container wiring every service to the shared pool and event channel.
#[derive(Clone)]
pub struct AppServices {
    pub inventory: InventoryService,
    pub sales: SalesService,
    pub categories: CategoryService,
    pub users: UserService,
    pub reports: ReportService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        catalog: Arc<RoleCatalog>,
    ) -> Self {
        Self {
            inventory: InventoryService::new(db.clone(), event_sender.clone()),
            sales: SalesService::new(db.clone(), event_sender.clone()),
            categories: CategoryService::new(db.clone(), event_sender.clone()),
            users: UserService::new(db.clone(), event_sender, catalog),
            reports: ReportService::new(db),
        }
    }
}
