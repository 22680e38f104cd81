//! Shared utilities and common types for the Comprar & Construir backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic helpers (hashing, HMAC signatures, random tokens)
//! - Access token issuing and validation
//! - Password hashing with Argon2id
//! - Brazilian document and address validation
//! - Offset pagination

pub mod crypto;
pub mod jwt;
pub mod pagination;
pub mod password;
pub mod validation;
