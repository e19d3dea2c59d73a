//! Credential and second-factor management core for a security-focused
//! banking system.
//!
//! The crate evaluates password strength against a fixed policy, orchestrates
//! password changes (standard and temporary-credential paths), and manages a
//! time-based second factor with single-use backup codes. All interaction
//! with the surrounding platform goes through narrow collaborator traits
//! ([`directory::UserDirectory`], [`identity::IdentityProvider`],
//! [`audit::AuditSink`], [`audit::IpResolver`]) so the core stays free of
//! backend specifics and global state.

pub mod audit;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod security;
pub mod service;

pub use error::SecurityError;
pub use service::{ClientInfo, CredentialService};
