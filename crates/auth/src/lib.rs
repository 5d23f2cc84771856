//! `spendwise-auth` — session verification and capability-based authorization.
//!
//! This crate is intentionally decoupled from HTTP and storage: it takes two
//! raw tokens and a capability, and returns a decision value.

pub mod capability;
pub mod claims;
pub mod config;
pub mod decision;
pub mod roles;
pub mod token;
pub mod verifier;

pub use capability::{Capability, GroupMembershipResolver, GroupNotFound};
pub use claims::{Identity, TokenClaims};
pub use config::{AuthConfig, ConfigError};
pub use decision::{AuthCause, AuthDecision, RefreshedToken, REFRESH_NOTICE};
pub use roles::{Role, UnknownRole};
pub use token::{TokenCodec, TokenError, TokenErrorKind};
pub use verifier::SessionVerifier;
