use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    sale::{self, SaleStatus},
    sale_transaction,
    stock_movement::{self, MovementType},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory::{commit_quantity, load_item, page_params, record_movement};
use crate::PaginatedResponse;

/// Reference kinds linking movements back to the sales ledger.
pub const REF_SALE: &str = "sale";
pub const REF_SALE_CANCEL: &str = "sale_cancel";
pub const REF_SALE_REFUND: &str = "sale_refund";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleLineInput {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSaleInput {
    #[validate(length(min = 1))]
    pub lines: Vec<SaleLineInput>,
    /// Fractional rate, e.g. 0.15 for 15%.
    pub tax_rate: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefundLineInput {
    pub transaction_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefundSaleInput {
    #[validate(length(min = 1))]
    pub items: Vec<RefundLineInput>,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct SaleDetails {
    #[serde(flatten)]
    pub sale: sale::Model,
    pub transactions: Vec<sale_transaction::Model>,
}

/// Cumulative quantity already refunded against a sale transaction, derived
/// from the ADJUSTMENT movements that restocked earlier refunds. The
/// transaction row itself is never amended.
async fn refunded_quantity<C: ConnectionTrait>(
    conn: &C,
    transaction_id: Uuid,
) -> Result<i32, ServiceError> {
    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ReferenceType.eq(REF_SALE_REFUND))
        .filter(stock_movement::Column::ReferenceId.eq(transaction_id))
        .all(conn)
        .await?;
    Ok(movements.iter().map(|m| m.quantity).sum())
}

/// The sales ledger. Sales decrement stock on creation; cancellation and
/// refunds restore it through compensating ADJUSTMENT movements, all inside
/// one transaction per operation.
#[derive(Clone)]
pub struct SalesService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl SalesService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(lines = input.lines.len()))]
    pub async fn create_sale(
        &self,
        input: CreateSaleInput,
        user_id: Option<Uuid>,
    ) -> Result<SaleDetails, ServiceError> {
        input.validate()?;
        if input.tax_rate < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Tax rate cannot be negative".to_string(),
            ));
        }
        if input.lines.iter().any(|l| l.quantity <= 0) {
            return Err(ServiceError::InvalidInput(
                "Line quantities must be positive".to_string(),
            ));
        }

        let details = self
            .db
            .transaction::<_, SaleDetails, ServiceError>(move |txn| {
                Box::pin(async move {
                    let sale_id = Uuid::new_v4();
                    let now = Utc::now();

                    // Transaction rows reference the sale, so the header goes
                    // in first; totals are filled in once the lines are known.
                    let header = sale::ActiveModel {
                        id: Set(sale_id),
                        subtotal: Set(Decimal::ZERO),
                        tax: Set(Decimal::ZERO),
                        total: Set(Decimal::ZERO),
                        status: Set(SaleStatus::Completed.to_string()),
                        notes: Set(input.notes),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    let sale = header.insert(txn).await?;

                    let mut subtotal = Decimal::ZERO;
                    let mut transactions = Vec::with_capacity(input.lines.len());

                    for line in &input.lines {
                        let item = load_item(txn, line.item_id).await?;
                        if line.quantity > item.quantity {
                            return Err(ServiceError::InsufficientStock(format!(
                                "Cannot sell {} units of {}, only {} on hand",
                                line.quantity, item.sku, item.quantity
                            )));
                        }
                        commit_quantity(txn, &item, item.quantity - line.quantity).await?;
                        record_movement(
                            txn,
                            item.id,
                            MovementType::Remove,
                            line.quantity,
                            Some(format!("Sale {}", sale_id)),
                            user_id,
                            Some((REF_SALE, sale_id)),
                        )
                        .await?;

                        let line_subtotal = (item.price * Decimal::from(line.quantity)).round_dp(2);
                        subtotal += line_subtotal;

                        let transaction = sale_transaction::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            sale_id: Set(sale_id),
                            inventory_item_id: Set(item.id),
                            quantity: Set(line.quantity),
                            unit_price: Set(item.price),
                            subtotal: Set(line_subtotal),
                        };
                        transactions.push(transaction.insert(txn).await?);
                    }

                    let tax = (subtotal * input.tax_rate).round_dp(2);
                    let mut totals: sale::ActiveModel = sale.into();
                    totals.subtotal = Set(subtotal);
                    totals.tax = Set(tax);
                    totals.total = Set(subtotal + tax);
                    let sale = totals.update(txn).await?;

                    Ok(SaleDetails { sale, transactions })
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::SaleCreated {
                sale_id: details.sale.id,
                total: details.sale.total,
            })
            .await;
        Ok(details)
    }

    /// Cancels a completed sale, restoring any quantity that has not
    /// already been refunded. Cancelling twice is a conflict.
    #[instrument(skip(self))]
    pub async fn cancel_sale(
        &self,
        sale_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<sale::Model, ServiceError> {
        let cancelled = self
            .db
            .transaction::<_, sale::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let sale = load_sale(txn, sale_id).await?;
                    if sale.is_cancelled() {
                        return Err(ServiceError::Conflict(format!(
                            "Sale {} is already cancelled",
                            sale_id
                        )));
                    }

                    let transactions = sale_transactions(txn, sale_id).await?;
                    for transaction in &transactions {
                        let already_refunded = refunded_quantity(txn, transaction.id).await?;
                        let remaining = transaction.quantity - already_refunded;
                        if remaining <= 0 {
                            continue;
                        }
                        let item = load_item(txn, transaction.inventory_item_id).await?;
                        commit_quantity(txn, &item, item.quantity + remaining).await?;
                        record_movement(
                            txn,
                            item.id,
                            MovementType::Adjustment,
                            remaining,
                            Some(format!("Sale cancelled: {}", sale_id)),
                            user_id,
                            Some((REF_SALE_CANCEL, sale_id)),
                        )
                        .await?;
                    }

                    let mut active: sale::ActiveModel = sale.into();
                    active.status = Set(SaleStatus::Cancelled.to_string());
                    active.updated_at = Set(Utc::now());
                    let sale = active.update(txn).await?;
                    Ok(sale)
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::SaleCancelled(sale_id))
            .await;
        Ok(cancelled)
    }

    /// Partially or fully refunds sale lines. Restocks each refunded
    /// quantity, reduces the sale's subtotal by the refunded value and
    /// recomputes tax at the sale's effective rate. Cumulative refunds per
    /// transaction are capped at the quantity originally sold.
    #[instrument(skip(self, input), fields(lines = input.items.len()))]
    pub async fn refund_sale(
        &self,
        sale_id: Uuid,
        input: RefundSaleInput,
        user_id: Option<Uuid>,
    ) -> Result<sale::Model, ServiceError> {
        input.validate()?;
        if input.items.iter().any(|l| l.quantity <= 0) {
            return Err(ServiceError::InvalidInput(
                "Refund quantities must be positive".to_string(),
            ));
        }

        let (refunded_sale, refund_amount) = self
            .db
            .transaction::<_, (sale::Model, Decimal), ServiceError>(move |txn| {
                Box::pin(async move {
                    let sale = load_sale(txn, sale_id).await?;
                    if sale.is_cancelled() {
                        return Err(ServiceError::InvalidInput(format!(
                            "Cannot refund cancelled sale {}",
                            sale_id
                        )));
                    }

                    let transactions: HashMap<Uuid, sale_transaction::Model> =
                        sale_transactions(txn, sale_id)
                            .await?
                            .into_iter()
                            .map(|t| (t.id, t))
                            .collect();

                    let mut refund_amount = Decimal::ZERO;
                    for line in &input.items {
                        let transaction =
                            transactions.get(&line.transaction_id).ok_or_else(|| {
                                ServiceError::InvalidInput(format!(
                                    "Transaction {} does not belong to sale {}",
                                    line.transaction_id, sale_id
                                ))
                            })?;

                        let already_refunded = refunded_quantity(txn, transaction.id).await?;
                        if already_refunded + line.quantity > transaction.quantity {
                            return Err(ServiceError::InvalidInput(format!(
                                "Refund of {} units exceeds the {} sold ({} already refunded)",
                                line.quantity, transaction.quantity, already_refunded
                            )));
                        }

                        let item = load_item(txn, transaction.inventory_item_id).await?;
                        commit_quantity(txn, &item, item.quantity + line.quantity).await?;
                        record_movement(
                            txn,
                            item.id,
                            MovementType::Adjustment,
                            line.quantity,
                            Some(format!("Refund: {}", input.reason)),
                            user_id,
                            Some((REF_SALE_REFUND, transaction.id)),
                        )
                        .await?;

                        refund_amount +=
                            (transaction.unit_price * Decimal::from(line.quantity)).round_dp(2);
                    }

                    // Tax follows the sale's effective rate so repeated
                    // partial refunds keep subtotal and tax proportional.
                    let rate = if sale.subtotal.is_zero() {
                        Decimal::ZERO
                    } else {
                        sale.tax / sale.subtotal
                    };
                    let new_subtotal = sale.subtotal - refund_amount;
                    let new_tax = (new_subtotal * rate).round_dp(2);

                    let combined_notes = match &sale.notes {
                        Some(existing) => format!("{}\nRefund: {}", existing, input.reason),
                        None => format!("Refund: {}", input.reason),
                    };

                    let mut active: sale::ActiveModel = sale.into();
                    active.subtotal = Set(new_subtotal);
                    active.tax = Set(new_tax);
                    active.total = Set(new_subtotal + new_tax);
                    active.notes = Set(Some(combined_notes));
                    active.updated_at = Set(Utc::now());
                    let sale = active.update(txn).await?;

                    Ok((sale, refund_amount))
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::SaleRefunded {
                sale_id,
                refund_amount,
            })
            .await;
        Ok(refunded_sale)
    }

    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleDetails, ServiceError> {
        let db = self.db.as_ref();
        let sale = load_sale(db, sale_id).await?;
        let transactions = sale_transactions(db, sale_id).await?;
        Ok(SaleDetails { sale, transactions })
    }

    pub async fn list_sales(
        &self,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<PaginatedResponse<sale::Model>, ServiceError> {
        let (page, page_size) = page_params(page, page_size);
        let paginator = sale::Entity::find()
            .order_by(sale::Column::CreatedAt, Order::Desc)
            .paginate(self.db.as_ref(), page_size);
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

async fn load_sale<C: ConnectionTrait>(conn: &C, sale_id: Uuid) -> Result<sale::Model, ServiceError> {
    sale::Entity::find_by_id(sale_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Sale", sale_id))
}

async fn sale_transactions<C: ConnectionTrait>(
    conn: &C,
    sale_id: Uuid,
) -> Result<Vec<sale_transaction::Model>, ServiceError> {
    let transactions = sale_transaction::Entity::find()
        .filter(sale_transaction::Column::SaleId.eq(sale_id))
        .all(conn)
        .await?;
    Ok(transactions)
}
