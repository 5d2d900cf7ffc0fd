use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    category, inventory_item, price_history,
    stock_movement::{self, MovementType},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::PaginatedResponse;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Percentage margin derived from price and cost, rounded to two decimal
/// places. Zero cost yields zero margin rather than a division error.
pub fn compute_margin(price: Decimal, cost: Decimal) -> Decimal {
    if cost.is_zero() {
        return Decimal::ZERO;
    }
    ((price - cost) / cost * Decimal::ONE_HUNDRED).round_dp(2)
}

pub(crate) async fn load_item<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
) -> Result<inventory_item::Model, ServiceError> {
    inventory_item::Entity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Inventory item", item_id))
}

/// Writes the new quantity predicated on the version read in this
/// transaction. Zero rows affected means another writer got there first.
pub(crate) async fn commit_quantity<C: ConnectionTrait>(
    conn: &C,
    item: &inventory_item::Model,
    new_quantity: i32,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    let patch = inventory_item::ActiveModel {
        quantity: Set(new_quantity),
        version: Set(item.version + 1),
        last_updated: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let result = inventory_item::Entity::update_many()
        .set(patch)
        .filter(inventory_item::Column::Id.eq(item.id))
        .filter(inventory_item::Column::Version.eq(item.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::Conflict(format!(
            "Inventory item {} was modified concurrently",
            item.id
        )));
    }
    Ok(())
}

/// Appends the movement row that accounts for a quantity change. For
/// ADJUSTMENT the quantity is the signed delta, otherwise the magnitude.
pub(crate) async fn record_movement<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    movement_type: MovementType,
    quantity: i32,
    notes: Option<String>,
    user_id: Option<Uuid>,
    reference: Option<(&str, Uuid)>,
) -> Result<stock_movement::Model, ServiceError> {
    let (reference_type, reference_id) = match reference {
        Some((kind, id)) => (Some(kind.to_string()), Some(id)),
        None => (None, None),
    };
    let movement = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        inventory_item_id: Set(item_id),
        movement_type: Set(movement_type.to_string()),
        quantity: Set(quantity),
        notes: Set(notes),
        user_id: Set(user_id),
        reference_type: Set(reference_type),
        reference_id: Set(reference_id),
        created_at: Set(Utc::now()),
    };
    let created = movement.insert(conn).await?;
    Ok(created)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateItemInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    pub price: Decimal,
    pub cost: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub min_stock_level: i32,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    #[validate(range(min = 0))]
    pub min_stock_level: Option<i32>,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
    pub change_reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemDeletion {
    pub item_id: Uuid,
    pub movements_deleted: u64,
    pub price_history_deleted: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct MovementFilter {
    pub movement_type: Option<MovementType>,
    pub category_id: Option<Uuid>,
    /// Free-text match on item name or SKU.
    pub search: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub sort: Option<SortDirection>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ItemFilter {
    pub category_id: Option<Uuid>,
    /// Free-text match on item name or SKU.
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

pub(crate) fn page_params(page: Option<u64>, page_size: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}

/// The inventory ledger. Every mutation runs in one transaction, bumps the
/// item's version, and leaves exactly one movement or price-history row
/// behind per change.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_item(
        &self,
        input: CreateItemInput,
        user_id: Option<Uuid>,
    ) -> Result<inventory_item::Model, ServiceError> {
        input.validate()?;
        if input.price < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Price cannot be negative".to_string(),
            ));
        }
        if input.cost < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Cost cannot be negative".to_string(),
            ));
        }

        let created = self
            .db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    if let Some(category_id) = input.category_id {
                        category::Entity::find_by_id(category_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| ServiceError::not_found("Category", category_id))?;
                    }

                    let sku_taken = inventory_item::Entity::find()
                        .filter(inventory_item::Column::Sku.eq(input.sku.as_str()))
                        .one(txn)
                        .await?
                        .is_some();
                    if sku_taken {
                        return Err(ServiceError::Conflict(format!(
                            "SKU {} is already in use",
                            input.sku
                        )));
                    }

                    let now = Utc::now();
                    let item = inventory_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(input.name),
                        description: Set(input.description),
                        sku: Set(input.sku),
                        price: Set(input.price),
                        cost: Set(input.cost),
                        margin: Set(compute_margin(input.price, input.cost)),
                        quantity: Set(input.quantity),
                        min_stock_level: Set(input.min_stock_level),
                        location: Set(input.location.filter(|l| !l.is_empty())),
                        category_id: Set(input.category_id),
                        version: Set(1),
                        last_updated: Set(now),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    let item = item.insert(txn).await?;

                    if item.quantity > 0 {
                        record_movement(
                            txn,
                            item.id,
                            MovementType::Initial,
                            item.quantity,
                            Some("Initial stock".to_string()),
                            user_id,
                            None,
                        )
                        .await?;
                    }

                    Ok(item)
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::ItemCreated(created.id))
            .await;
        Ok(created)
    }

    /// General field update. A price or cost change recomputes the margin
    /// and appends exactly one price-history snapshot in the same
    /// transaction.
    #[instrument(skip(self, input))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        input: UpdateItemInput,
        user_id: Option<Uuid>,
    ) -> Result<inventory_item::Model, ServiceError> {
        input.validate()?;
        if input.price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(ServiceError::InvalidInput(
                "Price cannot be negative".to_string(),
            ));
        }
        if input.cost.is_some_and(|c| c < Decimal::ZERO) {
            return Err(ServiceError::InvalidInput(
                "Cost cannot be negative".to_string(),
            ));
        }

        let (updated, price_change) = self
            .db
            .transaction::<_, (inventory_item::Model, Option<(Decimal, Decimal)>), ServiceError>(
                move |txn| {
                Box::pin(async move {
                    let item = load_item(txn, item_id).await?;

                    if let Some(sku) = &input.sku {
                        let sku_taken = inventory_item::Entity::find()
                            .filter(inventory_item::Column::Sku.eq(sku.as_str()))
                            .filter(inventory_item::Column::Id.ne(item.id))
                            .one(txn)
                            .await?
                            .is_some();
                        if sku_taken {
                            return Err(ServiceError::Conflict(format!(
                                "SKU {} is already in use",
                                sku
                            )));
                        }
                    }
                    if let Some(category_id) = input.category_id {
                        category::Entity::find_by_id(category_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| ServiceError::not_found("Category", category_id))?;
                    }

                    let new_price = input.price.unwrap_or(item.price);
                    let new_cost = input.cost.unwrap_or(item.cost);
                    let price_changed = new_price != item.price || new_cost != item.cost;
                    let new_margin = if price_changed {
                        compute_margin(new_price, new_cost)
                    } else {
                        item.margin
                    };

                    let now = Utc::now();
                    let mut patch = inventory_item::ActiveModel {
                        version: Set(item.version + 1),
                        updated_at: Set(now),
                        ..Default::default()
                    };
                    if let Some(name) = input.name {
                        patch.name = Set(name);
                    }
                    if let Some(description) = input.description {
                        patch.description = Set(Some(description).filter(|d| !d.is_empty()));
                    }
                    if let Some(sku) = input.sku {
                        patch.sku = Set(sku);
                    }
                    if let Some(level) = input.min_stock_level {
                        patch.min_stock_level = Set(level);
                    }
                    if let Some(location) = input.location {
                        patch.location = Set(Some(location).filter(|l| !l.is_empty()));
                    }
                    if let Some(category_id) = input.category_id {
                        patch.category_id = Set(Some(category_id));
                    }
                    if price_changed {
                        patch.price = Set(new_price);
                        patch.cost = Set(new_cost);
                        patch.margin = Set(new_margin);
                        patch.last_updated = Set(now);
                    }

                    let result = inventory_item::Entity::update_many()
                        .set(patch)
                        .filter(inventory_item::Column::Id.eq(item.id))
                        .filter(inventory_item::Column::Version.eq(item.version))
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Inventory item {} was modified concurrently",
                            item.id
                        )));
                    }

                    if price_changed {
                        let snapshot = price_history::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            inventory_item_id: Set(item.id),
                            old_price: Set(item.price),
                            new_price: Set(new_price),
                            old_cost: Set(item.cost),
                            new_cost: Set(new_cost),
                            old_margin: Set(item.margin),
                            new_margin: Set(new_margin),
                            change_reason: Set(input.change_reason),
                            user_id: Set(user_id),
                            created_at: Set(now),
                        };
                        snapshot.insert(txn).await?;
                    }

                    let price_change = price_changed.then_some((item.price, new_price));
                    let reloaded = load_item(txn, item_id).await?;
                    Ok((reloaded, price_change))
                })
            })
            .await?;

        if let Some((old_price, new_price)) = price_change {
            self.event_sender
                .send_post_commit(Event::PriceChanged {
                    item_id,
                    old_price,
                    new_price,
                })
                .await;
        }
        self.event_sender
            .send_post_commit(Event::ItemUpdated(updated.id))
            .await;
        Ok(updated)
    }

    /// Deletes the item together with its movement and price-history rows.
    /// Returns how many audit rows went with it.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<ItemDeletion, ServiceError> {
        let deletion = self
            .db
            .transaction::<_, ItemDeletion, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = load_item(txn, item_id).await?;

                    let movements = stock_movement::Entity::delete_many()
                        .filter(stock_movement::Column::InventoryItemId.eq(item.id))
                        .exec(txn)
                        .await?;
                    let history = price_history::Entity::delete_many()
                        .filter(price_history::Column::InventoryItemId.eq(item.id))
                        .exec(txn)
                        .await?;
                    inventory_item::Entity::delete_by_id(item.id).exec(txn).await?;

                    Ok(ItemDeletion {
                        item_id: item.id,
                        movements_deleted: movements.rows_affected,
                        price_history_deleted: history.rows_affected,
                    })
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::ItemDeleted(item_id))
            .await;
        Ok(deletion)
    }

    #[instrument(skip(self))]
    pub async fn add_stock(
        &self,
        item_id: Uuid,
        quantity: i32,
        notes: Option<String>,
        user_id: Option<Uuid>,
    ) -> Result<inventory_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity to add must be positive".to_string(),
            ));
        }

        let updated = self
            .db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = load_item(txn, item_id).await?;
                    let new_quantity = item.quantity.checked_add(quantity).ok_or_else(|| {
                        ServiceError::InvalidInput("Quantity overflow".to_string())
                    })?;
                    commit_quantity(txn, &item, new_quantity).await?;
                    record_movement(
                        txn,
                        item.id,
                        MovementType::Add,
                        quantity,
                        notes,
                        user_id,
                        None,
                    )
                    .await?;
                    load_item(txn, item_id).await
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::StockAdded {
                item_id,
                quantity,
                new_quantity: updated.quantity,
            })
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn remove_stock(
        &self,
        item_id: Uuid,
        quantity: i32,
        notes: Option<String>,
        user_id: Option<Uuid>,
    ) -> Result<inventory_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity to remove must be positive".to_string(),
            ));
        }

        let updated = self
            .db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = load_item(txn, item_id).await?;
                    if quantity > item.quantity {
                        return Err(ServiceError::InsufficientStock(format!(
                            "Cannot remove {} units, only {} on hand",
                            quantity, item.quantity
                        )));
                    }
                    commit_quantity(txn, &item, item.quantity - quantity).await?;
                    record_movement(
                        txn,
                        item.id,
                        MovementType::Remove,
                        quantity,
                        notes,
                        user_id,
                        None,
                    )
                    .await?;
                    load_item(txn, item_id).await
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::StockRemoved {
                item_id,
                quantity,
                new_quantity: updated.quantity,
            })
            .await;
        Ok(updated)
    }

    /// Sets the absolute on-hand quantity, recording the signed delta.
    /// A no-op adjustment leaves no movement behind.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        item_id: Uuid,
        new_quantity: i32,
        notes: Option<String>,
        user_id: Option<Uuid>,
    ) -> Result<inventory_item::Model, ServiceError> {
        if new_quantity < 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity cannot be negative".to_string(),
            ));
        }

        let (updated, delta) = self
            .db
            .transaction::<_, (inventory_item::Model, i32), ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = load_item(txn, item_id).await?;
                    let delta = new_quantity - item.quantity;
                    if delta == 0 {
                        return Ok((item, 0));
                    }
                    commit_quantity(txn, &item, new_quantity).await?;
                    record_movement(
                        txn,
                        item.id,
                        MovementType::Adjustment,
                        delta,
                        notes,
                        user_id,
                        None,
                    )
                    .await?;
                    let item = load_item(txn, item_id).await?;
                    Ok((item, delta))
                })
            })
            .await?;

        if delta != 0 {
            self.event_sender
                .send_post_commit(Event::StockAdjusted {
                    item_id,
                    delta,
                    new_quantity: updated.quantity,
                })
                .await;
        }
        Ok(updated)
    }

    /// Moves the item to a new location. An empty string clears it. Not a
    /// quantity change, so no movement is recorded.
    #[instrument(skip(self))]
    pub async fn update_location(
        &self,
        item_id: Uuid,
        location: String,
    ) -> Result<inventory_item::Model, ServiceError> {
        let updated = self
            .db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = load_item(txn, item_id).await?;
                    let new_location = Some(location).filter(|l| !l.is_empty());
                    if item.location == new_location {
                        return Ok(item);
                    }

                    let patch = inventory_item::ActiveModel {
                        location: Set(new_location),
                        version: Set(item.version + 1),
                        updated_at: Set(Utc::now()),
                        ..Default::default()
                    };
                    let result = inventory_item::Entity::update_many()
                        .set(patch)
                        .filter(inventory_item::Column::Id.eq(item.id))
                        .filter(inventory_item::Column::Version.eq(item.version))
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Inventory item {} was modified concurrently",
                            item.id
                        )));
                    }
                    load_item(txn, item_id).await
                })
            })
            .await?;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn update_min_stock_level(
        &self,
        item_id: Uuid,
        min_stock_level: i32,
    ) -> Result<inventory_item::Model, ServiceError> {
        if min_stock_level < 0 {
            return Err(ServiceError::InvalidInput(
                "Minimum stock level cannot be negative".to_string(),
            ));
        }

        let updated = self
            .db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = load_item(txn, item_id).await?;
                    if item.min_stock_level == min_stock_level {
                        return Ok(item);
                    }

                    let patch = inventory_item::ActiveModel {
                        min_stock_level: Set(min_stock_level),
                        version: Set(item.version + 1),
                        updated_at: Set(Utc::now()),
                        ..Default::default()
                    };
                    let result = inventory_item::Entity::update_many()
                        .set(patch)
                        .filter(inventory_item::Column::Id.eq(item.id))
                        .filter(inventory_item::Column::Version.eq(item.version))
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Inventory item {} was modified concurrently",
                            item.id
                        )));
                    }
                    load_item(txn, item_id).await
                })
            })
            .await?;

        Ok(updated)
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<inventory_item::Model, ServiceError> {
        load_item(self.db.as_ref(), item_id).await
    }

    pub async fn list_items(
        &self,
        filter: ItemFilter,
    ) -> Result<PaginatedResponse<inventory_item::Model>, ServiceError> {
        let (page, page_size) = page_params(filter.page, filter.page_size);

        let mut query = inventory_item::Entity::find();
        if let Some(category_id) = filter.category_id {
            query = query.filter(inventory_item::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(inventory_item::Column::Name.contains(search))
                    .add(inventory_item::Column::Sku.contains(search)),
            );
        }
        let query = query.order_by(inventory_item::Column::Name, Order::Asc);

        let paginator = query.paginate(self.db.as_ref(), page_size);
        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(PaginatedResponse {
            items,
            total: totals.number_of_items,
            page,
            page_size,
            total_pages: totals.number_of_pages,
        })
    }

    /// Price-history snapshots for an item, newest first.
    pub async fn price_history(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<price_history::Model>, ServiceError> {
        load_item(self.db.as_ref(), item_id).await?;
        let history = price_history::Entity::find()
            .filter(price_history::Column::InventoryItemId.eq(item_id))
            .order_by(price_history::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await?;
        Ok(history)
    }

    /// Movement audit trail across all items, filterable by type, category,
    /// item name/SKU text and date range.
    pub async fn list_movements(
        &self,
        filter: MovementFilter,
    ) -> Result<PaginatedResponse<stock_movement::Model>, ServiceError> {
        let (page, page_size) = page_params(filter.page, filter.page_size);

        let mut query = stock_movement::Entity::find();
        if let Some(movement_type) = filter.movement_type {
            query = query.filter(stock_movement::Column::MovementType.eq(movement_type.to_string()));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(stock_movement::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(stock_movement::Column::CreatedAt.lte(end));
        }

        let needs_join = filter.category_id.is_some()
            || filter.search.as_deref().is_some_and(|s| !s.is_empty());
        if needs_join {
            query = query.inner_join(inventory_item::Entity);
            if let Some(category_id) = filter.category_id {
                query = query.filter(inventory_item::Column::CategoryId.eq(category_id));
            }
            if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
                query = query.filter(
                    Condition::any()
                        .add(inventory_item::Column::Name.contains(search))
                        .add(inventory_item::Column::Sku.contains(search)),
                );
            }
        }

        let order = match filter.sort.unwrap_or_default() {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        let query = query.order_by(stock_movement::Column::CreatedAt, order);

        let paginator = query.paginate(self.db.as_ref(), page_size);
        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(PaginatedResponse {
            items,
            total: totals.number_of_items,
            page,
            page_size,
            total_pages: totals.number_of_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn margin_is_markup_over_cost() {
        assert_eq!(compute_margin(dec!(150), dec!(100)), dec!(50.00));
        assert_eq!(compute_margin(dec!(100), dec!(100)), dec!(0.00));
        assert_eq!(compute_margin(dec!(75), dec!(100)), dec!(-25.00));
    }

    #[test]
    fn margin_guards_zero_cost() {
        assert_eq!(compute_margin(dec!(99.99), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn margin_rounds_to_cents() {
        // (10 - 3) / 3 * 100 = 233.333...
        assert_eq!(compute_margin(dec!(10), dec!(3)), dec!(233.33));
    }

    #[test]
    fn page_params_clamp_bounds() {
        assert_eq!(page_params(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page_params(Some(0), Some(0)), (1, 1));
        assert_eq!(page_params(Some(3), Some(1000)), (3, MAX_PAGE_SIZE));
    }
}
