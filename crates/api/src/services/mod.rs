//! Application services and external integrations.

pub mod audit;
pub mod auth;
pub mod cookies;
pub mod email;
pub mod lookup;
pub mod rate_limiter;
pub mod token;
pub mod two_factor;
pub mod webhook_signature;

pub use auth::{AuthError, AuthService, LoginOutcome};
pub use cookies::SessionCookies;
pub use email::EmailService;
pub use lookup::LookupService;
pub use rate_limiter::{FixedWindowLimiter, RateDecision};
pub use token::{resolve_token, ResolvedToken, TokenSource};
pub use two_factor::TwoFactorService;
