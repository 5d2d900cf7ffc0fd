mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use stockroom_api::entities::{
    sale::SaleStatus,
    stock_movement::{self, MovementType},
};
use stockroom_api::errors::ServiceError;
use stockroom_api::services::inventory::CreateItemInput;
use stockroom_api::services::sales::{
    CreateSaleInput, RefundLineInput, RefundSaleInput, SaleDetails, SaleLineInput, REF_SALE_REFUND,
};
use stockroom_api::AppState;

async fn seed_item(state: &AppState, sku: &str, price: Decimal, quantity: i32) -> Uuid {
    state
        .services
        .inventory
        .create_item(
            CreateItemInput {
                name: format!("Item {}", sku),
                description: None,
                sku: sku.to_string(),
                price,
                cost: dec!(1.00),
                quantity,
                min_stock_level: 0,
                location: None,
                category_id: None,
            },
            None,
        )
        .await
        .unwrap()
        .id
}

/// Ten units at 10.00 with 15% tax: subtotal 100, tax 15, total 115.
async fn seed_sale(state: &AppState) -> (Uuid, SaleDetails) {
    let item_id = seed_item(state, "SALE-1", dec!(10.00), 20).await;
    let details = state
        .services
        .sales
        .create_sale(
            CreateSaleInput {
                lines: vec![SaleLineInput {
                    item_id,
                    quantity: 10,
                }],
                tax_rate: dec!(0.15),
                notes: None,
            },
            None,
        )
        .await
        .unwrap();
    (item_id, details)
}

fn refund(transaction_id: Uuid, quantity: i32, reason: &str) -> RefundSaleInput {
    RefundSaleInput {
        items: vec![RefundLineInput {
            transaction_id,
            quantity,
        }],
        reason: reason.to_string(),
    }
}

#[tokio::test]
async fn sale_creation_decrements_stock_and_totals_lines() {
    let state = common::test_state().await;
    let (item_id, details) = seed_sale(&state).await;

    assert_eq!(details.sale.subtotal, dec!(100.00));
    assert_eq!(details.sale.tax, dec!(15.00));
    assert_eq!(details.sale.total, dec!(115.00));
    assert_eq!(details.sale.status, SaleStatus::Completed.to_string());
    assert_eq!(details.transactions.len(), 1);
    assert_eq!(details.transactions[0].unit_price, dec!(10.00));

    let item = state.services.inventory.get_item(item_id).await.unwrap();
    assert_eq!(item.quantity, 10);
}

#[tokio::test]
async fn sale_lines_are_persisted_against_the_sale_row() {
    let state = common::test_state().await;
    let (_, details) = seed_sale(&state).await;

    // The foreign key holds: line rows land in the store referencing the
    // committed sale header, and reading the sale back returns them.
    let stored = stockroom_api::entities::sale_transaction::Entity::find()
        .filter(
            stockroom_api::entities::sale_transaction::Column::SaleId.eq(details.sale.id),
        )
        .all(state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].quantity, 10);

    let reread = state.services.sales.get_sale(details.sale.id).await.unwrap();
    assert_eq!(reread.sale.subtotal, dec!(100.00));
    assert_eq!(reread.transactions.len(), 1);
}

#[tokio::test]
async fn empty_line_lists_are_rejected_up_front() {
    let state = common::test_state().await;
    let (_, details) = seed_sale(&state).await;
    let sales = &state.services.sales;

    assert_matches!(
        sales
            .create_sale(
                CreateSaleInput {
                    lines: vec![],
                    tax_rate: Decimal::ZERO,
                    notes: None,
                },
                None,
            )
            .await
            .unwrap_err(),
        ServiceError::InvalidInput(_)
    );
    assert_matches!(
        sales
            .refund_sale(
                details.sale.id,
                RefundSaleInput {
                    items: vec![],
                    reason: "nothing to refund".to_string(),
                },
                None,
            )
            .await
            .unwrap_err(),
        ServiceError::InvalidInput(_)
    );
}

#[tokio::test]
async fn partial_refund_restocks_and_keeps_tax_proportional() {
    let state = common::test_state().await;
    let (item_id, details) = seed_sale(&state).await;
    let transaction_id = details.transactions[0].id;

    let sale = state
        .services
        .sales
        .refund_sale(details.sale.id, refund(transaction_id, 4, "damaged"), None)
        .await
        .unwrap();

    assert_eq!(sale.subtotal, dec!(60.00));
    assert_eq!(sale.tax, dec!(9.00));
    assert_eq!(sale.total, dec!(69.00));
    assert!(sale.notes.as_deref().unwrap().contains("Refund: damaged"));

    let item = state.services.inventory.get_item(item_id).await.unwrap();
    assert_eq!(item.quantity, 14);

    // The restock is an ADJUSTMENT tied to the sale transaction, which is
    // how later refunds find the cumulative total.
    let restocks = stock_movement::Entity::find()
        .filter(stock_movement::Column::ReferenceType.eq(REF_SALE_REFUND))
        .filter(stock_movement::Column::ReferenceId.eq(transaction_id))
        .all(state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(restocks.len(), 1);
    assert_eq!(restocks[0].movement_type(), Some(MovementType::Adjustment));
    assert_eq!(restocks[0].quantity, 4);

    // The transaction row itself is untouched.
    let details = state.services.sales.get_sale(sale.id).await.unwrap();
    assert_eq!(details.transactions[0].quantity, 10);
}

#[tokio::test]
async fn cumulative_refunds_are_capped_at_quantity_sold() {
    let state = common::test_state().await;
    let (_, details) = seed_sale(&state).await;
    let sale_id = details.sale.id;
    let transaction_id = details.transactions[0].id;
    let sales = &state.services.sales;

    sales
        .refund_sale(sale_id, refund(transaction_id, 4, "first"), None)
        .await
        .unwrap();
    let sale = sales
        .refund_sale(sale_id, refund(transaction_id, 6, "second"), None)
        .await
        .unwrap();
    assert_eq!(sale.subtotal, dec!(0.00));
    assert_eq!(sale.total, dec!(0.00));

    assert_matches!(
        sales
            .refund_sale(sale_id, refund(transaction_id, 1, "too much"), None)
            .await
            .unwrap_err(),
        ServiceError::InvalidInput(_)
    );
}

#[tokio::test]
async fn single_refund_over_quantity_sold_is_rejected() {
    let state = common::test_state().await;
    let (item_id, details) = seed_sale(&state).await;

    assert_matches!(
        state
            .services
            .sales
            .refund_sale(
                details.sale.id,
                refund(details.transactions[0].id, 11, "oversized"),
                None,
            )
            .await
            .unwrap_err(),
        ServiceError::InvalidInput(_)
    );

    // Rejected refunds leave stock alone.
    let item = state.services.inventory.get_item(item_id).await.unwrap();
    assert_eq!(item.quantity, 10);
}

#[tokio::test]
async fn refund_against_foreign_transaction_is_rejected() {
    let state = common::test_state().await;
    let (_, details) = seed_sale(&state).await;

    assert_matches!(
        state
            .services
            .sales
            .refund_sale(details.sale.id, refund(Uuid::new_v4(), 1, "wrong sale"), None)
            .await
            .unwrap_err(),
        ServiceError::InvalidInput(_)
    );
}

#[tokio::test]
async fn cancel_restores_stock_and_cannot_repeat() {
    let state = common::test_state().await;
    let (item_id, details) = seed_sale(&state).await;
    let sales = &state.services.sales;

    let sale = sales.cancel_sale(details.sale.id, None).await.unwrap();
    assert_eq!(sale.status, SaleStatus::Cancelled.to_string());

    let item = state.services.inventory.get_item(item_id).await.unwrap();
    assert_eq!(item.quantity, 20);

    assert_matches!(
        sales.cancel_sale(details.sale.id, None).await.unwrap_err(),
        ServiceError::Conflict(_)
    );
}

#[tokio::test]
async fn cancel_after_partial_refund_restocks_only_the_remainder() {
    let state = common::test_state().await;
    let (item_id, details) = seed_sale(&state).await;
    let sales = &state.services.sales;

    sales
        .refund_sale(details.sale.id, refund(details.transactions[0].id, 4, "partial"), None)
        .await
        .unwrap();
    sales.cancel_sale(details.sale.id, None).await.unwrap();

    // 20 on hand, sold 10, refund restored 4, cancel restored the other 6.
    let item = state.services.inventory.get_item(item_id).await.unwrap();
    assert_eq!(item.quantity, 20);
}

#[tokio::test]
async fn refunding_a_cancelled_sale_is_rejected() {
    let state = common::test_state().await;
    let (_, details) = seed_sale(&state).await;
    let sales = &state.services.sales;

    sales.cancel_sale(details.sale.id, None).await.unwrap();
    assert_matches!(
        sales
            .refund_sale(
                details.sale.id,
                refund(details.transactions[0].id, 1, "late"),
                None,
            )
            .await
            .unwrap_err(),
        ServiceError::InvalidInput(_)
    );
}

#[tokio::test]
async fn insufficient_line_rolls_back_the_whole_sale() {
    let state = common::test_state().await;
    let plentiful = seed_item(&state, "MANY-1", dec!(5.00), 50).await;
    let scarce = seed_item(&state, "FEW-1", dec!(5.00), 2).await;

    let err = state
        .services
        .sales
        .create_sale(
            CreateSaleInput {
                lines: vec![
                    SaleLineInput {
                        item_id: plentiful,
                        quantity: 10,
                    },
                    SaleLineInput {
                        item_id: scarce,
                        quantity: 5,
                    },
                ],
                tax_rate: Decimal::ZERO,
                notes: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // First line's decrement rolled back with the transaction.
    let item = state.services.inventory.get_item(plentiful).await.unwrap();
    assert_eq!(item.quantity, 50);
    assert_eq!(
        state.services.sales.list_sales(None, None).await.unwrap().total,
        0
    );
}

#[tokio::test]
async fn multi_line_sale_sums_line_subtotals() {
    let state = common::test_state().await;
    let a = seed_item(&state, "MUL-A", dec!(3.33), 10).await;
    let b = seed_item(&state, "MUL-B", dec!(7.50), 10).await;

    let details = state
        .services
        .sales
        .create_sale(
            CreateSaleInput {
                lines: vec![
                    SaleLineInput {
                        item_id: a,
                        quantity: 3,
                    },
                    SaleLineInput {
                        item_id: b,
                        quantity: 2,
                    },
                ],
                tax_rate: dec!(0.10),
                notes: Some("walk-in".to_string()),
            },
            None,
        )
        .await
        .unwrap();

    // 9.99 + 15.00 = 24.99, tax 2.50 after rounding.
    assert_eq!(details.sale.subtotal, dec!(24.99));
    assert_eq!(details.sale.tax, dec!(2.50));
    assert_eq!(details.sale.total, dec!(27.49));
    assert_eq!(details.transactions.len(), 2);
}
