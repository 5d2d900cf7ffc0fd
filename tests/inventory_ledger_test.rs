mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use stockroom_api::entities::{
    inventory_item, price_history,
    stock_movement::{self, MovementType},
};
use stockroom_api::errors::ServiceError;
use stockroom_api::services::inventory::{
    CreateItemInput, ItemFilter, MovementFilter, SortDirection, UpdateItemInput,
};

fn item_input(name: &str, sku: &str, quantity: i32) -> CreateItemInput {
    CreateItemInput {
        name: name.to_string(),
        description: None,
        sku: sku.to_string(),
        price: dec!(10.00),
        cost: dec!(4.00),
        quantity,
        min_stock_level: 2,
        location: None,
        category_id: None,
    }
}

async fn movements_for(
    state: &stockroom_api::AppState,
    item_id: Uuid,
) -> Vec<stock_movement::Model> {
    stock_movement::Entity::find()
        .filter(stock_movement::Column::InventoryItemId.eq(item_id))
        .all(state.db.as_ref())
        .await
        .unwrap()
}

#[tokio::test]
async fn stock_lifecycle_keeps_quantity_consistent() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;

    let item = inventory
        .create_item(item_input("Widget", "WID-1", 10), None)
        .await
        .unwrap();
    assert_eq!(item.quantity, 10);
    assert_eq!(item.margin, dec!(150.00));

    let item = inventory.add_stock(item.id, 5, None, None).await.unwrap();
    assert_eq!(item.quantity, 15);

    let err = inventory
        .remove_stock(item.id, 20, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let item = inventory.remove_stock(item.id, 15, None, None).await.unwrap();
    assert_eq!(item.quantity, 0);

    let err = inventory
        .adjust_stock(item.id, -1, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));

    // One movement per successful quantity change: INITIAL, ADD, REMOVE.
    let movements = movements_for(&state, item.id).await;
    assert_eq!(movements.len(), 3);
    let types: Vec<_> = movements
        .iter()
        .filter_map(|m| m.movement_type())
        .collect();
    assert!(types.contains(&MovementType::Initial));
    assert!(types.contains(&MovementType::Add));
    assert!(types.contains(&MovementType::Remove));
}

#[tokio::test]
async fn adjustment_records_signed_delta() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;

    let item = inventory
        .create_item(item_input("Gadget", "GAD-1", 10), None)
        .await
        .unwrap();

    let item = inventory.adjust_stock(item.id, 4, None, None).await.unwrap();
    assert_eq!(item.quantity, 4);

    let movements = movements_for(&state, item.id).await;
    let adjustment = movements
        .iter()
        .find(|m| m.movement_type() == Some(MovementType::Adjustment))
        .expect("adjustment movement");
    assert_eq!(adjustment.quantity, -6);

    // Adjusting to the current quantity is a no-op with no audit row.
    inventory.adjust_stock(item.id, 4, None, None).await.unwrap();
    assert_eq!(movements_for(&state, item.id).await.len(), 2);
}

#[tokio::test]
async fn price_change_appends_exactly_one_history_row() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;

    let item = inventory
        .create_item(item_input("Thing", "THG-1", 1), None)
        .await
        .unwrap();

    // Name-only change leaves no snapshot.
    inventory
        .update_item(
            item.id,
            UpdateItemInput {
                name: Some("Thing v2".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let updated = inventory
        .update_item(
            item.id,
            UpdateItemInput {
                price: Some(dec!(12.00)),
                change_reason: Some("supplier increase".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(updated.price, dec!(12.00));
    assert_eq!(updated.margin, dec!(200.00));

    let history = inventory.price_history(item.id).await.unwrap();
    assert_eq!(history.len(), 1);
    let snapshot = &history[0];
    assert_eq!(snapshot.old_price, dec!(10.00));
    assert_eq!(snapshot.new_price, dec!(12.00));
    assert_eq!(snapshot.old_margin, dec!(150.00));
    assert_eq!(snapshot.new_margin, dec!(200.00));
    assert_eq!(snapshot.change_reason.as_deref(), Some("supplier increase"));

    // Cost-only change snapshots too.
    inventory
        .update_item(
            item.id,
            UpdateItemInput {
                cost: Some(dec!(6.00)),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(inventory.price_history(item.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_cascades_and_counts_audit_rows() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;

    let item = inventory
        .create_item(item_input("Doomed", "DOOM-1", 5), None)
        .await
        .unwrap();
    inventory.add_stock(item.id, 3, None, None).await.unwrap();
    inventory
        .update_item(
            item.id,
            UpdateItemInput {
                price: Some(dec!(11.00)),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let deletion = inventory.delete_item(item.id).await.unwrap();
    assert_eq!(deletion.movements_deleted, 2);
    assert_eq!(deletion.price_history_deleted, 1);

    assert_matches!(
        inventory.get_item(item.id).await.unwrap_err(),
        ServiceError::NotFound(_)
    );
    assert!(movements_for(&state, item.id).await.is_empty());
    assert_eq!(
        price_history::Entity::find()
            .filter(price_history::Column::InventoryItemId.eq(item.id))
            .count(state.db.as_ref())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn concurrent_removals_never_oversell() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;

    let item = inventory
        .create_item(item_input("Contested", "CON-1", 10), None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let inventory = state.services.inventory.clone();
        let item_id = item.id;
        handles.push(tokio::spawn(async move {
            // A lost version race is retryable; only a genuine shortage is
            // a terminal failure.
            loop {
                match inventory.remove_stock(item_id, 1, None, None).await {
                    Ok(_) => return true,
                    Err(ServiceError::Conflict(_)) => continue,
                    Err(ServiceError::InsufficientStock(_)) => return false,
                    Err(e) => panic!("unexpected error: {:?}", e),
                }
            }
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 10);

    let item = inventory.get_item(item.id).await.unwrap();
    assert_eq!(item.quantity, 0);

    let removes = movements_for(&state, item.id)
        .await
        .into_iter()
        .filter(|m| m.movement_type() == Some(MovementType::Remove))
        .count();
    assert_eq!(removes, 10);
}

#[tokio::test]
async fn movement_listing_filters_and_paginates() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;

    let a = inventory
        .create_item(item_input("Alpha", "ALP-1", 5), None)
        .await
        .unwrap();
    let b = inventory
        .create_item(item_input("Beta", "BET-1", 5), None)
        .await
        .unwrap();
    inventory.add_stock(a.id, 1, None, None).await.unwrap();
    inventory.add_stock(a.id, 2, None, None).await.unwrap();
    inventory.remove_stock(b.id, 1, None, None).await.unwrap();

    // Type filter.
    let adds = inventory
        .list_movements(MovementFilter {
            movement_type: Some(MovementType::Add),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(adds.total, 2);
    assert!(adds
        .items
        .iter()
        .all(|m| m.movement_type() == Some(MovementType::Add)));

    // Search joins through the item.
    let beta_only = inventory
        .list_movements(MovementFilter {
            search: Some("BET".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(beta_only.total, 2); // INITIAL + REMOVE
    assert!(beta_only.items.iter().all(|m| m.inventory_item_id == b.id));

    // Pagination with ascending sort.
    let page = inventory
        .list_movements(MovementFilter {
            sort: Some(SortDirection::Asc),
            page: Some(1),
            page_size: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_pages, 3);
    assert!(page.items[0].created_at <= page.items[1].created_at);
}

#[tokio::test]
async fn item_listing_filters_by_category_and_search() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;
    let categories = &state.services.categories;

    let tools = categories
        .create_category(stockroom_api::services::categories::CategoryInput {
            name: "Tools".to_string(),
            description: None,
        })
        .await
        .unwrap();

    let mut input = item_input("Hammer", "HAM-1", 3);
    input.category_id = Some(tools.id);
    inventory.create_item(input, None).await.unwrap();
    inventory
        .create_item(item_input("Nails", "NAI-1", 100), None)
        .await
        .unwrap();

    let in_tools = inventory
        .list_items(ItemFilter {
            category_id: Some(tools.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(in_tools.total, 1);
    assert_eq!(in_tools.items[0].name, "Hammer");

    let by_sku = inventory
        .list_items(ItemFilter {
            search: Some("NAI".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_sku.total, 1);
    assert_eq!(by_sku.items[0].name, "Nails");
}

#[tokio::test]
async fn duplicate_sku_conflicts_and_location_updates_quietly() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;

    let item = inventory
        .create_item(item_input("Original", "DUP-1", 1), None)
        .await
        .unwrap();
    assert_matches!(
        inventory
            .create_item(item_input("Copy", "DUP-1", 1), None)
            .await
            .unwrap_err(),
        ServiceError::Conflict(_)
    );

    let item = inventory
        .update_location(item.id, "Aisle 7".to_string())
        .await
        .unwrap();
    assert_eq!(item.location.as_deref(), Some("Aisle 7"));

    let item = inventory
        .update_location(item.id, String::new())
        .await
        .unwrap();
    assert_eq!(item.location, None);

    // Location changes are not quantity changes; only INITIAL exists.
    assert_eq!(movements_for(&state, item.id).await.len(), 1);

    let missing = Uuid::new_v4();
    assert_matches!(
        inventory
            .update_location(missing, "anywhere".to_string())
            .await
            .unwrap_err(),
        ServiceError::NotFound(_)
    );
}

#[tokio::test]
async fn unknown_category_rejected_on_create() {
    let state = common::test_state().await;
    let mut input = item_input("Orphan", "ORP-1", 1);
    input.category_id = Some(Uuid::new_v4());
    assert_matches!(
        state
            .services
            .inventory
            .create_item(input, None)
            .await
            .unwrap_err(),
        ServiceError::NotFound(_)
    );
}

#[tokio::test]
async fn min_stock_level_validation() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;
    let item = inventory
        .create_item(item_input("Levelled", "LVL-1", 1), None)
        .await
        .unwrap();

    let item = inventory
        .update_min_stock_level(item.id, 9)
        .await
        .unwrap();
    assert_eq!(item.min_stock_level, 9);

    assert_matches!(
        inventory
            .update_min_stock_level(item.id, -1)
            .await
            .unwrap_err(),
        ServiceError::InvalidInput(_)
    );
}

#[tokio::test]
async fn item_version_advances_with_each_write() {
    let state = common::test_state().await;
    let inventory = &state.services.inventory;
    let item = inventory
        .create_item(item_input("Versioned", "VER-1", 5), None)
        .await
        .unwrap();
    assert_eq!(item.version, 1);

    let item = inventory.add_stock(item.id, 1, None, None).await.unwrap();
    assert_eq!(item.version, 2);

    let stored = inventory_item::Entity::find_by_id(item.id)
        .one(state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.version, 2);
}
