use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::{
    inventory_item,
    sale::{self, SaleStatus},
};
use crate::errors::ServiceError;

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockEntry {
    pub item_id: Uuid,
    pub name: String,
    pub sku: String,
    pub quantity: i32,
    pub min_stock_level: i32,
    /// Units short of the minimum level.
    pub deficit: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarginEntry {
    pub item_id: Uuid,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub margin: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SalesSummaryFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesSummary {
    pub completed_count: u64,
    pub cancelled_count: u64,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Items at or below their minimum stock level, worst deficit first.
    pub async fn low_stock(&self) -> Result<Vec<LowStockEntry>, ServiceError> {
        let items = inventory_item::Entity::find()
            .filter(
                Expr::col(inventory_item::Column::Quantity)
                    .lte(Expr::col(inventory_item::Column::MinStockLevel)),
            )
            .order_by(inventory_item::Column::Quantity, Order::Asc)
            .all(self.db.as_ref())
            .await?;

        let mut entries: Vec<LowStockEntry> = items
            .into_iter()
            .map(|item| LowStockEntry {
                item_id: item.id,
                name: item.name,
                sku: item.sku,
                quantity: item.quantity,
                min_stock_level: item.min_stock_level,
                deficit: item.min_stock_level - item.quantity,
            })
            .collect();
        entries.sort_by(|a, b| b.deficit.cmp(&a.deficit));
        Ok(entries)
    }

    /// All items ranked by stored margin, highest first.
    pub async fn margins(&self) -> Result<Vec<MarginEntry>, ServiceError> {
        let items = inventory_item::Entity::find()
            .order_by(inventory_item::Column::Margin, Order::Desc)
            .all(self.db.as_ref())
            .await?;

        Ok(items
            .into_iter()
            .map(|item| MarginEntry {
                item_id: item.id,
                name: item.name,
                sku: item.sku,
                price: item.price,
                cost: item.cost,
                margin: item.margin,
            })
            .collect())
    }

    /// Sales totals over an optional date window. Cancelled sales are
    /// counted but excluded from the monetary sums.
    pub async fn sales_summary(
        &self,
        filter: SalesSummaryFilter,
    ) -> Result<SalesSummary, ServiceError> {
        let mut query = sale::Entity::find();
        if let Some(start) = filter.start_date {
            query = query.filter(sale::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(sale::Column::CreatedAt.lte(end));
        }
        let sales = query.all(self.db.as_ref()).await?;

        let mut summary = SalesSummary {
            completed_count: 0,
            cancelled_count: 0,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
        };
        for sale in sales {
            if sale.status == SaleStatus::Cancelled.to_string() {
                summary.cancelled_count += 1;
                continue;
            }
            summary.completed_count += 1;
            summary.subtotal += sale.subtotal;
            summary.tax += sale.tax;
            summary.total += sale.total;
        }
        Ok(summary)
    }
}
