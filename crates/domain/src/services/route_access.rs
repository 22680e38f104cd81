//! Page access rules applied before serving front-end routes.
//!
//! The decision only needs the request path and what the session cookie says
//! about the visitor, so it stays free of HTTP types and is tested here.

use crate::models::role::Role;

pub const LOGIN_PATH: &str = "/login";
pub const CHANGE_PASSWORD_PATH: &str = "/alterar-senha";
const DASHBOARD_PREFIX: &str = "/dashboard";

/// What the route guard knows about a visitor with a valid session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub role: Role,
    pub must_change_password: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// Send the visitor to the login page, remembering where they were going.
    Login { redirect: String },
    Redirect(String),
}

/// True when `path` is `prefix` itself or a sub-path of it.
fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.starts_with('/'))
}

fn required_role(path: &str) -> Option<Role> {
    [Role::Admin, Role::Supplier, Role::Client]
        .into_iter()
        .find(|role| under(path, role.dashboard_path()))
}

/// Decides whether a page request proceeds or is redirected.
pub fn decide(path: &str, session: Option<&SessionInfo>) -> RouteDecision {
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    let protected = under(path, DASHBOARD_PREFIX) || path == CHANGE_PASSWORD_PATH;

    let session = match session {
        Some(session) => session,
        None if protected => {
            return RouteDecision::Login {
                redirect: path.to_string(),
            }
        }
        None => return RouteDecision::Allow,
    };

    if path == LOGIN_PATH {
        return RouteDecision::Redirect(landing_for(session).to_string());
    }

    if !under(path, DASHBOARD_PREFIX) {
        return RouteDecision::Allow;
    }

    if session.must_change_password {
        return RouteDecision::Redirect(CHANGE_PASSWORD_PATH.to_string());
    }

    match required_role(path) {
        Some(required) if session.role.satisfies(required) => RouteDecision::Allow,
        _ => RouteDecision::Redirect(session.role.dashboard_path().to_string()),
    }
}

fn landing_for(session: &SessionInfo) -> &'static str {
    if session.must_change_password {
        CHANGE_PASSWORD_PATH
    } else {
        session.role.dashboard_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> SessionInfo {
        SessionInfo {
            role,
            must_change_password: false,
        }
    }

    fn redirect(to: &str) -> RouteDecision {
        RouteDecision::Redirect(to.to_string())
    }

    #[test]
    fn test_anonymous_dashboard_goes_to_login() {
        assert_eq!(
            decide("/dashboard/cliente/cotacoes", None),
            RouteDecision::Login {
                redirect: "/dashboard/cliente/cotacoes".into()
            }
        );
        assert_eq!(
            decide("/alterar-senha", None),
            RouteDecision::Login {
                redirect: "/alterar-senha".into()
            }
        );
    }

    #[test]
    fn test_anonymous_public_pages_allowed() {
        assert_eq!(decide("/", None), RouteDecision::Allow);
        assert_eq!(decide("/login", None), RouteDecision::Allow);
        assert_eq!(decide("/sobre", None), RouteDecision::Allow);
        assert_eq!(decide("/dashboards-info", None), RouteDecision::Allow);
    }

    #[test]
    fn test_role_dashboards() {
        let supplier = session(Role::Supplier);
        assert_eq!(decide("/dashboard/fornecedor", Some(&supplier)), RouteDecision::Allow);
        assert_eq!(
            decide("/dashboard/admin/usuarios", Some(&supplier)),
            redirect("/dashboard/fornecedor")
        );
        assert_eq!(
            decide("/dashboard/cliente", Some(&supplier)),
            redirect("/dashboard/fornecedor")
        );
    }

    #[test]
    fn test_admin_enters_every_dashboard() {
        let admin = session(Role::Admin);
        for path in ["/dashboard/admin", "/dashboard/fornecedor/x", "/dashboard/cliente/"] {
            assert_eq!(decide(path, Some(&admin)), RouteDecision::Allow, "{}", path);
        }
    }

    #[test]
    fn test_bare_dashboard_redirects_to_role_home() {
        assert_eq!(
            decide("/dashboard", Some(&session(Role::Client))),
            redirect("/dashboard/cliente")
        );
    }

    #[test]
    fn test_must_change_password() {
        let pending = SessionInfo {
            role: Role::Client,
            must_change_password: true,
        };
        assert_eq!(decide("/dashboard/cliente", Some(&pending)), redirect("/alterar-senha"));
        assert_eq!(decide("/alterar-senha", Some(&pending)), RouteDecision::Allow);
        assert_eq!(decide("/login", Some(&pending)), redirect("/alterar-senha"));
    }

    #[test]
    fn test_login_with_session_goes_home() {
        assert_eq!(
            decide("/login", Some(&session(Role::Admin))),
            redirect("/dashboard/admin")
        );
        assert_eq!(decide("/", Some(&session(Role::Admin))), RouteDecision::Allow);
    }
}
