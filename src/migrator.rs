use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240501_000001_create_rbac_tables::Migration),
            Box::new(m20240501_000002_create_users_table::Migration),
            Box::new(m20240501_000003_create_categories_table::Migration),
            Box::new(m20240501_000004_create_inventory_items_table::Migration),
            Box::new(m20240501_000005_create_stock_movements_table::Migration),
            Box::new(m20240501_000006_create_price_history_table::Migration),
            Box::new(m20240501_000007_create_sales_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240501_000001_create_rbac_tables {
    use sea_orm_migration::prelude::*;
    use uuid::Uuid;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000001_create_rbac_tables"
        }
    }

    /// Role -> permission grants seeded at install time. Wildcards follow the
    /// `resource:*` convention; the admin role holds wildcard grants for every
    /// resource it governs.
    fn seed_roles() -> Vec<(&'static str, &'static str, Vec<&'static str>)> {
        vec![
            (
                "viewer",
                "Read-only access to inventory, categories and sales",
                vec!["inventory:read", "categories:read", "sales:read"],
            ),
            (
                "operator",
                "Day-to-day stock operations",
                vec![
                    "inventory:read",
                    "categories:read",
                    "sales:read",
                    "inventory:adjust",
                    "sales:create",
                ],
            ),
            (
                "manager",
                "Product, category and refund management",
                vec![
                    "inventory:read",
                    "categories:read",
                    "sales:read",
                    "inventory:adjust",
                    "sales:create",
                    "inventory:manage",
                    "categories:manage",
                    "sales:refund",
                    "reports:read",
                ],
            ),
            (
                "admin",
                "Administrator with full access",
                vec![
                    "inventory:*",
                    "categories:*",
                    "sales:*",
                    "users:*",
                    "reports:*",
                ],
            ),
        ]
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Roles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Roles::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Roles::Name).string().not_null())
                        .col(ColumnDef::new(Roles::Description).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_roles_name")
                        .table(Roles::Table)
                        .col(Roles::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Permissions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Permissions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Permissions::Name).string().not_null())
                        .col(ColumnDef::new(Permissions::Description).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_permissions_name")
                        .table(Permissions::Table)
                        .col(Permissions::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RolePermissions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(RolePermissions::RoleId).uuid().not_null())
                        .col(
                            ColumnDef::new(RolePermissions::PermissionId)
                                .uuid()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(RolePermissions::RoleId)
                                .col(RolePermissions::PermissionId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_role_permissions_role")
                                .from(RolePermissions::Table, RolePermissions::RoleId)
                                .to(Roles::Table, Roles::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_role_permissions_permission")
                                .from(RolePermissions::Table, RolePermissions::PermissionId)
                                .to(Permissions::Table, Permissions::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // Seed reference data. Permissions are deduplicated across roles.
            let mut permission_ids: std::collections::HashMap<&str, Uuid> =
                std::collections::HashMap::new();

            for (_, _, perms) in seed_roles() {
                for perm in perms {
                    if permission_ids.contains_key(perm) {
                        continue;
                    }
                    let id = Uuid::new_v4();
                    permission_ids.insert(perm, id);
                    manager
                        .exec_stmt(
                            Query::insert()
                                .into_table(Permissions::Table)
                                .columns([Permissions::Id, Permissions::Name])
                                .values_panic([id.into(), perm.into()])
                                .to_owned(),
                        )
                        .await?;
                }
            }

            for (role, description, perms) in seed_roles() {
                let role_id = Uuid::new_v4();
                manager
                    .exec_stmt(
                        Query::insert()
                            .into_table(Roles::Table)
                            .columns([Roles::Id, Roles::Name, Roles::Description])
                            .values_panic([role_id.into(), role.into(), description.into()])
                            .to_owned(),
                    )
                    .await?;

                for perm in perms {
                    let perm_id = permission_ids[perm];
                    manager
                        .exec_stmt(
                            Query::insert()
                                .into_table(RolePermissions::Table)
                                .columns([RolePermissions::RoleId, RolePermissions::PermissionId])
                                .values_panic([role_id.into(), perm_id.into()])
                                .to_owned(),
                        )
                        .await?;
                }
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RolePermissions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Permissions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Roles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Roles {
        Table,
        Id,
        Name,
        Description,
    }

    #[derive(DeriveIden)]
    pub enum Permissions {
        Table,
        Id,
        Name,
        Description,
    }

    #[derive(DeriveIden)]
    pub enum RolePermissions {
        Table,
        RoleId,
        PermissionId,
    }
}

mod m20240501_000002_create_users_table {
    use sea_orm_migration::prelude::*;

    use super::m20240501_000001_create_rbac_tables::Roles;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000002_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::ExternalId).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::FirstName).string().null())
                        .col(ColumnDef::new(Users::LastName).string().null())
                        .col(ColumnDef::new(Users::RoleId).uuid().not_null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_role")
                                .from(Users::Table, Users::RoleId)
                                .to(Roles::Table, Roles::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // Unique external_id is the authoritative guard against racing
            // lazy creation of the same identity.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_external_id")
                        .table(Users::Table)
                        .col(Users::ExternalId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_email")
                        .table(Users::Table)
                        .col(Users::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        ExternalId,
        Email,
        FirstName,
        LastName,
        RoleId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240501_000003_create_categories_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000003_create_categories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::Description).string().null())
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Categories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_categories_name")
                        .table(Categories::Table)
                        .col(Categories::Name)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Categories {
        Table,
        Id,
        Name,
        Description,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240501_000004_create_inventory_items_table {
    use sea_orm_migration::prelude::*;

    use super::m20240501_000003_create_categories_table::Categories;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000004_create_inventory_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Description).string().null())
                        .col(ColumnDef::new(InventoryItems::Sku).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::Cost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::Margin)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::MinStockLevel)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InventoryItems::Location).string().null())
                        .col(ColumnDef::new(InventoryItems::CategoryId).uuid().null())
                        .col(
                            ColumnDef::new(InventoryItems::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::LastUpdated)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_items_category")
                                .from(InventoryItems::Table, InventoryItems::CategoryId)
                                .to(Categories::Table, Categories::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_sku")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_category_id")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::CategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum InventoryItems {
        Table,
        Id,
        Name,
        Description,
        Sku,
        Price,
        Cost,
        Margin,
        Quantity,
        MinStockLevel,
        Location,
        CategoryId,
        Version,
        LastUpdated,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240501_000005_create_stock_movements_table {
    use sea_orm_migration::prelude::*;

    use super::m20240501_000004_create_inventory_items_table::InventoryItems;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000005_create_stock_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::InventoryItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::Notes).string().null())
                        .col(ColumnDef::new(StockMovements::UserId).uuid().null())
                        .col(
                            ColumnDef::new(StockMovements::ReferenceType)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(StockMovements::ReferenceId).uuid().null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_item")
                                .from(StockMovements::Table, StockMovements::InventoryItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_item_id")
                        .table(StockMovements::Table)
                        .col(StockMovements::InventoryItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_created_at")
                        .table(StockMovements::Table)
                        .col(StockMovements::CreatedAt)
                        .to_owned(),
                )
                .await?;

            // Refund-cap lookups sum movements by reference.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_reference")
                        .table(StockMovements::Table)
                        .col(StockMovements::ReferenceType)
                        .col(StockMovements::ReferenceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        InventoryItemId,
        MovementType,
        Quantity,
        Notes,
        UserId,
        ReferenceType,
        ReferenceId,
        CreatedAt,
    }
}

mod m20240501_000006_create_price_history_table {
    use sea_orm_migration::prelude::*;

    use super::m20240501_000004_create_inventory_items_table::InventoryItems;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000006_create_price_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PriceHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PriceHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PriceHistory::InventoryItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PriceHistory::OldPrice).decimal().not_null())
                        .col(ColumnDef::new(PriceHistory::NewPrice).decimal().not_null())
                        .col(ColumnDef::new(PriceHistory::OldCost).decimal().not_null())
                        .col(ColumnDef::new(PriceHistory::NewCost).decimal().not_null())
                        .col(
                            ColumnDef::new(PriceHistory::OldMargin)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PriceHistory::NewMargin)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PriceHistory::ChangeReason).string().null())
                        .col(ColumnDef::new(PriceHistory::UserId).uuid().null())
                        .col(
                            ColumnDef::new(PriceHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_price_history_item")
                                .from(PriceHistory::Table, PriceHistory::InventoryItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_price_history_item_id")
                        .table(PriceHistory::Table)
                        .col(PriceHistory::InventoryItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PriceHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PriceHistory {
        Table,
        Id,
        InventoryItemId,
        OldPrice,
        NewPrice,
        OldCost,
        NewCost,
        OldMargin,
        NewMargin,
        ChangeReason,
        UserId,
        CreatedAt,
    }
}

mod m20240501_000007_create_sales_tables {
    use sea_orm_migration::prelude::*;

    use super::m20240501_000004_create_inventory_items_table::InventoryItems;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000007_create_sales_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Sales::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Sales::Tax).decimal().not_null().default(0))
                        .col(
                            ColumnDef::new(Sales::Total)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Sales::Status).string().not_null())
                        .col(ColumnDef::new(Sales::Notes).string().null())
                        .col(
                            ColumnDef::new(Sales::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sales::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SaleTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SaleTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SaleTransactions::SaleId).uuid().not_null())
                        .col(
                            ColumnDef::new(SaleTransactions::InventoryItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SaleTransactions::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SaleTransactions::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SaleTransactions::Subtotal)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_transactions_sale")
                                .from(SaleTransactions::Table, SaleTransactions::SaleId)
                                .to(Sales::Table, Sales::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_transactions_item")
                                .from(SaleTransactions::Table, SaleTransactions::InventoryItemId)
                                .to(InventoryItems::Table, InventoryItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_transactions_sale_id")
                        .table(SaleTransactions::Table)
                        .col(SaleTransactions::SaleId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SaleTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
        Subtotal,
        Tax,
        Total,
        Status,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SaleTransactions {
        Table,
        Id,
        SaleId,
        InventoryItemId,
        Quantity,
        UnitPrice,
        Subtotal,
    }
}
