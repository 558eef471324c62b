//! Role model - named bundles of permission strings.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Role entity. Permissions are plain strings; the effective rights of a user
/// are the set union over every role they hold.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Role {
    pub role_id: Uuid,
    pub name: String,
    pub permissions: Vec<String>,
    pub created_utc: DateTime<Utc>,
}

impl Role {
    pub fn new(name: String, permissions: Vec<String>) -> Self {
        Self {
            role_id: Uuid::new_v4(),
            name,
            permissions,
            created_utc: Utc::now(),
        }
    }
}

/// Union the permission lists of the given roles. Duplicates, whether within
/// one role or across roles, collapse to a single entry.
pub fn aggregate_permissions<'a, I>(roles: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a Role>,
{
    roles
        .into_iter()
        .flat_map(|role| role.permissions.iter())
        .map(|permission| permission.to_string())
        .collect()
}

/// Role names are matched case-insensitively everywhere; the catalog keeps
/// the canonical casing.
pub fn role_name_matches(held: &str, wanted: &str) -> bool {
    held.eq_ignore_ascii_case(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str, permissions: &[&str]) -> Role {
        Role::new(
            name.to_string(),
            permissions.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[test]
    fn union_deduplicates_across_roles() {
        let regular = role("Regular User", &["create_groups", "send_messages"]);
        let seller = role("Seller", &["create_offers", "send_messages"]);

        let permissions = aggregate_permissions([&regular, &seller]);
        assert_eq!(permissions.len(), 3);
        assert!(permissions.contains("create_groups"));
        assert!(permissions.contains("create_offers"));
        assert!(permissions.contains("send_messages"));
    }

    #[test]
    fn duplicates_within_one_role_collapse() {
        let noisy = role("Noisy", &["moderate_content", "moderate_content"]);
        let permissions = aggregate_permissions([&noisy]);
        assert_eq!(permissions.len(), 1);
    }

    #[test]
    fn no_roles_means_no_permissions() {
        let permissions = aggregate_permissions::<[&Role; 0]>([]);
        assert!(permissions.is_empty());
    }

    #[test]
    fn superset_grows_and_shrinks_with_membership() {
        let regular = role("Regular User", &["create_groups", "join_events"]);
        let seller = role("Seller", &["create_offers"]);

        let only_regular = aggregate_permissions([&regular]);
        let both = aggregate_permissions([&regular, &seller]);
        let only_seller = aggregate_permissions([&seller]);

        assert!(both.is_superset(&only_regular));
        assert!(both.len() > only_regular.len());
        assert_eq!(
            only_seller,
            seller.permissions.iter().cloned().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn role_names_match_case_insensitively() {
        assert!(role_name_matches("Admin", "admin"));
        assert!(role_name_matches("regular user", "Regular User"));
        assert!(!role_name_matches("Admin", "Seller"));
    }
}
