//! Domain layer for the Comprar & Construir marketplace.
//!
//! This crate contains:
//! - Domain models (accounts, suppliers, quotes, proposals, orders, chat)
//! - Pure business rules (role resolution, order transitions, route access)

pub mod models;
pub mod services;
