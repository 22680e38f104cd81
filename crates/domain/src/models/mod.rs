//! Domain models for the marketplace.

pub mod audit_log;
pub mod catalog;
pub mod chat;
pub mod client;
pub mod order;
pub mod proposal;
pub mod quote;
pub mod role;
pub mod stats;
pub mod supplier;
pub mod user;
pub mod webhook_event;

pub use audit_log::{AuditEntry, AuditLog};
pub use catalog::{Grupo, Material};
pub use chat::{ChatMessage, ChatRoom};
pub use client::Client;
pub use order::{Order, OrderStatus, PaymentStatus};
pub use proposal::{Proposal, ProposalStatus};
pub use quote::{Quote, QuoteItem, QuoteStatus};
pub use role::Role;
pub use supplier::Supplier;
pub use user::{User, UserStatus, UserSummary};
pub use webhook_event::{WebhookEvent, WebhookProvider};
