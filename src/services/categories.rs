use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{category, inventory_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory::page_params;
use crate::PaginatedResponse;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: CategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;

        let created = self
            .db
            .transaction::<_, category::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let name_taken = category::Entity::find()
                        .filter(category::Column::Name.eq(input.name.as_str()))
                        .one(txn)
                        .await?
                        .is_some();
                    if name_taken {
                        return Err(ServiceError::Conflict(format!(
                            "Category {} already exists",
                            input.name
                        )));
                    }

                    let now = Utc::now();
                    let model = category::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(input.name),
                        description: Set(input.description.filter(|d| !d.is_empty())),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    let created = model.insert(txn).await?;
                    Ok(created)
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::CategoryCreated(created.id))
            .await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: CategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;

        let updated = self
            .db
            .transaction::<_, category::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = category::Entity::find_by_id(category_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Category", category_id))?;

                    let name_taken = category::Entity::find()
                        .filter(category::Column::Name.eq(input.name.as_str()))
                        .filter(category::Column::Id.ne(category_id))
                        .one(txn)
                        .await?
                        .is_some();
                    if name_taken {
                        return Err(ServiceError::Conflict(format!(
                            "Category {} already exists",
                            input.name
                        )));
                    }

                    let mut active: category::ActiveModel = existing.into();
                    active.name = Set(input.name);
                    active.description = Set(input.description.filter(|d| !d.is_empty()));
                    active.updated_at = Set(Utc::now());
                    let updated = active.update(txn).await?;
                    Ok(updated)
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::CategoryUpdated(category_id))
            .await;
        Ok(updated)
    }

    /// Deletion is blocked while inventory items still reference the
    /// category; callers must reassign or delete those items first.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    category::Entity::find_by_id(category_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Category", category_id))?;

                    let in_use = inventory_item::Entity::find()
                        .filter(inventory_item::Column::CategoryId.eq(category_id))
                        .count(txn)
                        .await?;
                    if in_use > 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Category {} is referenced by {} inventory item(s)",
                            category_id, in_use
                        )));
                    }

                    category::Entity::delete_by_id(category_id).exec(txn).await?;
                    Ok(())
                })
            })
            .await?;

        self.event_sender
            .send_post_commit(Event::CategoryDeleted(category_id))
            .await;
        Ok(())
    }

    pub async fn get_category(&self, category_id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(category_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", category_id))
    }

    pub async fn list_categories(
        &self,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<PaginatedResponse<category::Model>, ServiceError> {
        let (page, page_size) = page_params(page, page_size);
        let paginator = category::Entity::find()
            .order_by(category::Column::Name, Order::Asc)
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
