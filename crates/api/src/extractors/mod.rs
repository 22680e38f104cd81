//! Custom Axum extractors.

pub mod client_ip;
pub mod current_user;

pub use client_ip::ClientIp;
pub use current_user::CurrentUser;
