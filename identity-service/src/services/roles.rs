//! Role administration and permission aggregation.
//!
//! Roles are data: a name plus a permission list. A user's effective rights
//! are recomputed on every read as the union over their current assignments,
//! so a grant or revocation is visible to the very next check.

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::{aggregate_permissions, role_name_matches, AuditLogEntry, RequestOrigin};
use crate::services::{Database, ServiceError};

pub const DEFAULT_ROLE: &str = "Regular User";
pub const SELLER_ROLE: &str = "Seller";

#[derive(Clone)]
pub struct RoleService {
    db: Database,
}

impl RoleService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Grant a role to a user. Idempotent: granting an already-held role is a
    /// silent success and writes no audit entry. A fresh grant and its
    /// `role_assigned` audit row commit together.
    pub async fn assign_role(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        role_name: &str,
        origin: &RequestOrigin,
    ) -> Result<(), ServiceError> {
        let (user, role) = self.load_pair(user_id, role_name).await?;

        let audit =
            AuditLogEntry::role_change("role_assigned", actor_id, user.user_id, &role.name, origin);
        let assigned = self.db.assign_role(user.user_id, role.role_id, &audit).await?;

        if assigned {
            tracing::info!(
                target_user_id = %user.user_id,
                role = %role.name,
                actor_id = %actor_id,
                "Role assigned"
            );
        }
        Ok(())
    }

    /// Revoke a role from a user. Idempotent: removing a role the user does
    /// not hold is a silent success.
    pub async fn remove_role(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        role_name: &str,
        origin: &RequestOrigin,
    ) -> Result<(), ServiceError> {
        let (user, role) = self.load_pair(user_id, role_name).await?;

        let audit =
            AuditLogEntry::role_change("role_removed", actor_id, user.user_id, &role.name, origin);
        let removed = self.db.remove_role(user.user_id, role.role_id, &audit).await?;

        if removed {
            tracing::info!(
                target_user_id = %user.user_id,
                role = %role.name,
                actor_id = %actor_id,
                "Role removed"
            );
        }
        Ok(())
    }

    /// Names of the roles the user currently holds.
    pub async fn roles_of(&self, user_id: Uuid) -> Result<Vec<String>, ServiceError> {
        let roles = self.db.roles_for_user(user_id).await?;
        Ok(roles.into_iter().map(|role| role.name).collect())
    }

    /// Effective permission set: union over all currently-assigned roles.
    pub async fn permissions_of(&self, user_id: Uuid) -> Result<BTreeSet<String>, ServiceError> {
        let roles = self.db.roles_for_user(user_id).await?;
        Ok(aggregate_permissions(roles.iter()))
    }

    pub async fn has_permission(
        &self,
        user_id: Uuid,
        permission: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self.permissions_of(user_id).await?.contains(permission))
    }

    /// Whether the user holds at least one of the given role names.
    pub async fn has_any_role(
        &self,
        user_id: Uuid,
        wanted: &[String],
    ) -> Result<bool, ServiceError> {
        let held = self.roles_of(user_id).await?;
        Ok(held
            .iter()
            .any(|name| wanted.iter().any(|w| role_name_matches(name, w))))
    }

    /// Self-service seller enrollment: the user grants themselves the Seller
    /// role. Being a seller already is a conflict, unlike the idempotent
    /// admin-facing assignment.
    pub async fn register_as_seller(
        &self,
        user_id: Uuid,
        origin: &RequestOrigin,
    ) -> Result<(), ServiceError> {
        let held = self.roles_of(user_id).await?;
        if held.iter().any(|name| role_name_matches(name, SELLER_ROLE)) {
            return Err(ServiceError::AlreadySeller);
        }
        self.assign_role(user_id, user_id, SELLER_ROLE, origin).await
    }

    async fn load_pair(
        &self,
        user_id: Uuid,
        role_name: &str,
    ) -> Result<(crate::models::User, crate::models::Role), ServiceError> {
        let user = self
            .db
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        let role = self
            .db
            .find_role_by_name(role_name)
            .await?
            .ok_or_else(|| ServiceError::RoleNotFound(role_name.to_string()))?;
        Ok((user, role))
    }
}
