//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod audit_log;
pub mod catalog;
pub mod chat;
pub mod profile;
pub mod quote;
pub mod user;
pub mod webhook_event;

pub use audit_log::AuditLogEntity;
pub use catalog::{GrupoEntity, MaterialEntity};
pub use chat::{ChatMessageEntity, ChatRoomEntity};
pub use profile::{ClientEntity, SupplierEntity};
pub use quote::{OrderEntity, ProposalEntity, QuoteEntity, QuoteItemEntity};
pub use user::UserEntity;
pub use webhook_event::WebhookEventEntity;
