//! Repository implementations for database operations.

pub mod audit_log;
pub mod catalog;
pub mod chat;
pub mod order;
pub mod proposal;
pub mod quote;
pub mod supplier;
pub mod user;
pub mod webhook_event;

pub use audit_log::AuditLogRepository;
pub use catalog::CatalogRepository;
pub use chat::ChatRepository;
pub use order::{OrderRepository, OrderScope};
pub use proposal::{AcceptOutcome, ProposalRepository};
pub use quote::QuoteRepository;
pub use supplier::{ClientRepository, SupplierInput, SupplierRepository};
pub use user::{CreatedAccount, NewAccount, UserRepository};
pub use webhook_event::WebhookEventRepository;
