use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::roles::{RoleCatalog, ROLE_ADMIN};
use crate::auth::Principal;
use crate::entities::user;
use crate::errors::ServiceError;

/// Maps provider identities onto local user rows.
///
/// Users are created lazily on first sight. The configured elevated email is
/// bootstrapped straight into the admin role, and an existing row for that
/// email is promoted if it somehow holds a lesser role. Everyone else starts
/// with the configured default role.
#[derive(Clone)]
pub struct IdentityBridge {
    db: Arc<DatabaseConnection>,
    catalog: Arc<RoleCatalog>,
    elevated_email: String,
    default_role: String,
}

impl IdentityBridge {
    pub fn new(
        db: Arc<DatabaseConnection>,
        catalog: Arc<RoleCatalog>,
        elevated_email: String,
        default_role: String,
    ) -> Self {
        Self {
            db,
            catalog,
            elevated_email,
            default_role,
        }
    }

    fn is_elevated(&self, email: &str) -> bool {
        email.eq_ignore_ascii_case(&self.elevated_email)
    }

    fn role_id_for(&self, name: &str) -> Result<Uuid, ServiceError> {
        self.catalog
            .role_id(name)
            .ok_or_else(|| ServiceError::InternalError(format!("Role not seeded: {}", name)))
    }

    /// Looks up the local user for a principal without creating one.
    pub async fn find_user(
        &self,
        principal: &Principal,
    ) -> Result<Option<user::Model>, ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::ExternalId.eq(principal.external_id.as_str()))
            .one(self.db.as_ref())
            .await?;
        Ok(found)
    }

    /// Resolves the local user for a principal, creating it on first sight.
    ///
    /// Idempotent: repeated calls for the same principal return the same row
    /// and never flip roles back and forth. The unique index on external_id
    /// is the authority when two requests race to create the same user.
    #[instrument(skip(self, principal), fields(external_id = %principal.external_id))]
    pub async fn sync_user(&self, principal: &Principal) -> Result<user::Model, ServiceError> {
        if let Some(existing) = self.find_user(principal).await? {
            return self.heal_role(existing).await;
        }

        let role_name = if self.is_elevated(&principal.email) {
            ROLE_ADMIN
        } else {
            self.default_role.as_str()
        };
        let role_id = self.role_id_for(role_name)?;

        let now = Utc::now();
        let candidate = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            external_id: Set(principal.external_id.clone()),
            email: Set(principal.email.clone()),
            first_name: Set(principal.first_name.clone()),
            last_name: Set(principal.last_name.clone()),
            role_id: Set(role_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match candidate.insert(self.db.as_ref()).await {
            Ok(created) => {
                info!(
                    "Provisioned user {} ({}) with role {}",
                    created.id, created.email, role_name
                );
                Ok(created)
            }
            Err(insert_err) => {
                // A concurrent request may have created the row first; the
                // unique external_id index rejects the loser. Re-read before
                // treating this as a real failure.
                match self.find_user(principal).await? {
                    Some(existing) => {
                        warn!(
                            "Lost provisioning race for external_id {}, using existing row",
                            principal.external_id
                        );
                        self.heal_role(existing).await
                    }
                    None => Err(ServiceError::DatabaseError(insert_err)),
                }
            }
        }
    }

    /// Promotes a mis-provisioned elevated user to admin. No-op otherwise.
    async fn heal_role(&self, existing: user::Model) -> Result<user::Model, ServiceError> {
        if !self.is_elevated(&existing.email) {
            return Ok(existing);
        }
        let admin_id = self.role_id_for(ROLE_ADMIN)?;
        if existing.role_id == admin_id {
            return Ok(existing);
        }

        info!("Promoting elevated user {} to admin", existing.email);
        let mut active: user::ActiveModel = existing.into();
        active.role_id = Set(admin_id);
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.db.as_ref()).await?;
        Ok(updated)
    }
}
