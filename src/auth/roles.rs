use sea_orm::{DatabaseConnection, EntityTrait};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::entities::{permission, role, role_permission};
use crate::errors::ServiceError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_OPERATOR: &str = "operator";
pub const ROLE_VIEWER: &str = "viewer";

pub const PERM_INVENTORY_READ: &str = "inventory:read";
pub const PERM_INVENTORY_ADJUST: &str = "inventory:adjust";
pub const PERM_INVENTORY_MANAGE: &str = "inventory:manage";
pub const PERM_CATEGORIES_READ: &str = "categories:read";
pub const PERM_CATEGORIES_MANAGE: &str = "categories:manage";
pub const PERM_SALES_READ: &str = "sales:read";
pub const PERM_SALES_CREATE: &str = "sales:create";
pub const PERM_SALES_REFUND: &str = "sales:refund";
pub const PERM_REPORTS_READ: &str = "reports:read";

#[derive(Debug, Clone)]
struct CatalogRole {
    id: Uuid,
    permissions: HashSet<String>,
}

/// Read-only view of the seeded roles and their permission grants. Loaded
/// once at startup; role changes require a migration and a restart.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    roles: HashMap<String, CatalogRole>,
}

impl RoleCatalog {
    /// Loads every role with its granted permissions from the database.
    pub async fn load(db: &DatabaseConnection) -> Result<Self, ServiceError> {
        let roles = role::Entity::find().all(db).await?;
        let permissions = permission::Entity::find().all(db).await?;
        let grants = role_permission::Entity::find().all(db).await?;

        let perm_names: HashMap<Uuid, String> = permissions
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let mut catalog: HashMap<String, CatalogRole> = roles
            .into_iter()
            .map(|r| {
                (
                    r.name,
                    CatalogRole {
                        id: r.id,
                        permissions: HashSet::new(),
                    },
                )
            })
            .collect();

        let ids_to_names: HashMap<Uuid, String> = catalog
            .iter()
            .map(|(name, entry)| (entry.id, name.clone()))
            .collect();

        for grant in grants {
            let (Some(role_name), Some(perm_name)) = (
                ids_to_names.get(&grant.role_id),
                perm_names.get(&grant.permission_id),
            ) else {
                continue;
            };
            if let Some(entry) = catalog.get_mut(role_name) {
                entry.permissions.insert(perm_name.clone());
            }
        }

        Ok(Self { roles: catalog })
    }

    pub fn role_id(&self, name: &str) -> Option<Uuid> {
        self.roles.get(name).map(|r| r.id)
    }

    pub fn role_name(&self, id: Uuid) -> Option<&str> {
        self.roles
            .iter()
            .find(|(_, entry)| entry.id == id)
            .map(|(name, _)| name.as_str())
    }

    pub fn role_names(&self) -> Vec<&str> {
        self.roles.keys().map(String::as_str).collect()
    }

    /// Whether the named role carries the required permission, honoring
    /// `resource:*` and bare `*` wildcard grants.
    pub fn role_has_permission(&self, role_name: &str, required: &str) -> bool {
        let Some(entry) = self.roles.get(role_name) else {
            return false;
        };
        entry
            .permissions
            .iter()
            .any(|granted| permission_matches(granted, required))
    }

    #[cfg(test)]
    pub(crate) fn from_grants(grants: &[(&str, &[&str])]) -> Self {
        let roles = grants
            .iter()
            .map(|(name, perms)| {
                (
                    name.to_string(),
                    CatalogRole {
                        id: Uuid::new_v4(),
                        permissions: perms.iter().map(|p| p.to_string()).collect(),
                    },
                )
            })
            .collect();
        Self { roles }
    }
}

/// Check if a granted permission satisfies a required permission.
pub fn permission_matches(granted: &str, required: &str) -> bool {
    // Direct match
    if granted == required {
        return true;
    }

    // Wildcard match
    if let Some(prefix) = granted.strip_suffix(":*") {
        if required
            .split_once(':')
            .is_some_and(|(resource, _)| resource == prefix)
        {
            return true;
        }
    }

    // Super wildcard
    granted == "*"
}
