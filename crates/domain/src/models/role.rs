//! Account roles and role resolution.
//!
//! Accounts carry a list of role names. Everything that needs a single role
//! (the API gate, the page route guard, login responses, admin listings)
//! goes through [`Role::resolve`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPPLIER: &str = "fornecedor";
pub const ROLE_CLIENT: &str = "cliente";

/// Effective role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "fornecedor")]
    Supplier,
    #[serde(rename = "cliente")]
    Client,
}

impl Role {
    /// Resolves the effective role from a stored role list.
    ///
    /// `admin` wins over `fornecedor`, which wins over everything else.
    /// An empty or unknown list resolves to [`Role::Client`].
    ///
    /// ```
    /// use domain::models::role::Role;
    ///
    /// let roles = vec!["cliente".to_string(), "fornecedor".to_string()];
    /// assert_eq!(Role::resolve(&roles), Role::Supplier);
    /// ```
    pub fn resolve<S: AsRef<str>>(roles: &[S]) -> Role {
        let parsed: Vec<Role> = roles
            .iter()
            .filter_map(|r| r.as_ref().parse::<Role>().ok())
            .collect();

        if parsed.contains(&Role::Admin) {
            Role::Admin
        } else if parsed.contains(&Role::Supplier) {
            Role::Supplier
        } else {
            Role::Client
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Supplier => ROLE_SUPPLIER,
            Role::Client => ROLE_CLIENT,
        }
    }

    /// Landing page for this role.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Admin => "/dashboard/admin",
            Role::Supplier => "/dashboard/fornecedor",
            Role::Client => "/dashboard/cliente",
        }
    }

    /// Role list persisted for a newly created account with this role.
    pub fn roles_for(&self) -> Vec<String> {
        vec![self.as_str().to_string()]
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Returns true if an account with this role may act as `required`.
    /// Admins pass every role check.
    pub fn satisfies(&self, required: Role) -> bool {
        self.is_admin() || *self == required
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "administrador" => Ok(Role::Admin),
            "fornecedor" | "supplier" => Ok(Role::Supplier),
            "cliente" | "client" | "customer" => Ok(Role::Client),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_admin_wins() {
        assert_eq!(
            Role::resolve(&roles(&["cliente", "fornecedor", "admin"])),
            Role::Admin
        );
    }

    #[test]
    fn test_resolve_supplier_over_client() {
        assert_eq!(Role::resolve(&roles(&["cliente", "fornecedor"])), Role::Supplier);
    }

    #[test]
    fn test_resolve_defaults_to_client() {
        assert_eq!(Role::resolve(&roles(&[])), Role::Client);
        assert_eq!(Role::resolve(&roles(&["unknown"])), Role::Client);
        assert_eq!(Role::resolve(&roles(&["cliente"])), Role::Client);
    }

    #[test]
    fn test_resolve_accepts_str_slices() {
        assert_eq!(Role::resolve(&["ADMIN"]), Role::Admin);
    }

    #[test]
    fn test_from_str_aliases() {
        assert_eq!("supplier".parse::<Role>().unwrap(), Role::Supplier);
        assert_eq!("Fornecedor".parse::<Role>().unwrap(), Role::Supplier);
        assert_eq!("client".parse::<Role>().unwrap(), Role::Client);
        assert!("manager".parse::<Role>().is_err());
    }

    #[test]
    fn test_dashboard_paths() {
        assert_eq!(Role::Admin.dashboard_path(), "/dashboard/admin");
        assert_eq!(Role::Supplier.dashboard_path(), "/dashboard/fornecedor");
        assert_eq!(Role::Client.dashboard_path(), "/dashboard/cliente");
    }

    #[test]
    fn test_satisfies() {
        assert!(Role::Admin.satisfies(Role::Supplier));
        assert!(Role::Supplier.satisfies(Role::Supplier));
        assert!(!Role::Client.satisfies(Role::Supplier));
    }

    #[test]
    fn test_serde_uses_portuguese_names() {
        assert_eq!(serde_json::to_string(&Role::Supplier).unwrap(), "\"fornecedor\"");
        let role: Role = serde_json::from_str("\"cliente\"").unwrap();
        assert_eq!(role, Role::Client);
        assert_eq!(Role::Supplier.roles_for(), vec!["fornecedor".to_string()]);
    }
}
