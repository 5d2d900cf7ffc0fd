use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::roles::RoleCatalog;
use crate::auth::{IdentityBridge, Principal};
use crate::entities::user;
use crate::errors::ServiceError;

/// What a route demands of the caller. At most one of role/permission is set;
/// an empty requirement means any authenticated principal passes.
#[derive(Debug, Clone, Default)]
pub struct AccessRequirement {
    pub role: Option<String>,
    pub permission: Option<String>,
}

impl AccessRequirement {
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn role(name: &str) -> Self {
        Self {
            role: Some(name.to_string()),
            permission: None,
        }
    }

    pub fn permission(name: &str) -> Self {
        Self {
            role: None,
            permission: Some(name.to_string()),
        }
    }
}

/// Diagnostic payload attached to every decision. Rendered into 403 bodies
/// so a denied caller can see exactly which requirement they missed.
#[derive(Debug, Clone, Serialize)]
pub struct AccessDebug {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AccessDecision {
    pub authorized: bool,
    pub user: user::Model,
    pub debug: AccessDebug,
}

impl AccessDecision {
    /// Converts a denial into the Forbidden error carrying the debug payload.
    pub fn into_result(self) -> Result<user::Model, ServiceError> {
        if self.authorized {
            Ok(self.user)
        } else {
            let message = self.debug.reason.clone();
            let debug = serde_json::to_value(&self.debug).ok();
            Err(ServiceError::Forbidden { message, debug })
        }
    }
}

/// Evaluates access requirements against the caller's seeded role.
#[derive(Clone)]
pub struct AuthorizationGuard {
    bridge: IdentityBridge,
    catalog: Arc<RoleCatalog>,
}

impl AuthorizationGuard {
    pub fn new(bridge: IdentityBridge, catalog: Arc<RoleCatalog>) -> Self {
        Self { bridge, catalog }
    }

    /// Resolves the principal to a local user (creating it on first sight)
    /// and checks the requirement against that user's role.
    #[instrument(skip(self, principal, requirement), fields(external_id = %principal.external_id))]
    pub async fn authorize(
        &self,
        principal: &Principal,
        requirement: &AccessRequirement,
    ) -> Result<AccessDecision, ServiceError> {
        let user = self.bridge.sync_user(principal).await?;
        let role_name = self
            .catalog
            .role_name(user.role_id)
            .unwrap_or("unknown")
            .to_string();

        let (authorized, reason) = if let Some(required_role) = &requirement.role {
            if &role_name == required_role {
                (true, format!("Role {} matches requirement", role_name))
            } else {
                (
                    false,
                    format!(
                        "Role {} does not satisfy required role {}",
                        role_name, required_role
                    ),
                )
            }
        } else if let Some(required_permission) = &requirement.permission {
            if self.catalog.role_has_permission(&role_name, required_permission) {
                (
                    true,
                    format!("Role {} grants {}", role_name, required_permission),
                )
            } else {
                (
                    false,
                    format!(
                        "Role {} lacks permission {}",
                        role_name, required_permission
                    ),
                )
            }
        } else {
            (true, "Authenticated access".to_string())
        };

        Ok(AccessDecision {
            authorized,
            debug: AccessDebug {
                user_id: user.id,
                email: user.email.clone(),
                role: role_name,
                required_role: requirement.role.clone(),
                required_permission: requirement.permission.clone(),
                reason,
            },
            user,
        })
    }

    /// Authorize and collapse the decision, returning the resolved user on
    /// success and Forbidden (with the debug payload) on denial.
    pub async fn require(
        &self,
        principal: &Principal,
        requirement: &AccessRequirement,
    ) -> Result<user::Model, ServiceError> {
        self.authorize(principal, requirement).await?.into_result()
    }
}
