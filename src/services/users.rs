use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::RoleCatalog;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory::page_params;
use crate::PaginatedResponse;

/// User row with the role id resolved to its name.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserView {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    catalog: Arc<RoleCatalog>,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        catalog: Arc<RoleCatalog>,
    ) -> Self {
        Self {
            db,
            event_sender,
            catalog,
        }
    }

    pub fn view(&self, model: user::Model) -> UserView {
        let role = self
            .catalog
            .role_name(model.role_id)
            .unwrap_or("unknown")
            .to_string();
        UserView {
            id: model.id,
            external_id: model.external_id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            role,
            created_at: model.created_at,
        }
    }

    pub async fn list_users(
        &self,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<PaginatedResponse<UserView>, ServiceError> {
        let (page, page_size) = page_params(page, page_size);
        let paginator = user::Entity::find()
            .order_by(user::Column::Email, Order::Asc)
            .paginate(self.db.as_ref(), page_size);
        let totals = paginator.num_items_and_pages().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(|m| self.view(m))
            .collect();
        Ok(PaginatedResponse {
            items,
            total: totals.number_of_items,
            page,
            page_size,
            total_pages: totals.number_of_pages,
        })
    }

    /// Moves a user to another seeded role. The catalog is the authority on
    /// what exists; a role it does not know is a 404.
    #[instrument(skip(self))]
    pub async fn assign_role(
        &self,
        user_id: Uuid,
        role_name: &str,
    ) -> Result<UserView, ServiceError> {
        let role_id = self
            .catalog
            .role_id(role_name)
            .ok_or_else(|| ServiceError::not_found("Role", role_name))?;

        let existing = user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        if existing.role_id == role_id {
            return Ok(self.view(existing));
        }

        let mut active: user::ActiveModel = existing.into();
        active.role_id = Set(role_id);
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.db.as_ref()).await?;

        info!("Assigned role {} to user {}", role_name, user_id);
        self.event_sender
            .send_post_commit(Event::RoleAssigned {
                user_id,
                role: role_name.to_string(),
            })
            .await;

        Ok(self.view(updated))
    }
}
