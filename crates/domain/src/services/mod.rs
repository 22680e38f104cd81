//! Pure business rules that operate on domain models.

pub mod route_access;

pub use route_access::{decide, RouteDecision, SessionInfo};
