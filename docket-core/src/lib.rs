//! Docket Core - shared types
//!
//! Error taxonomy, resource kinds and record identifiers, and the role-based
//! permission model. Every other crate in the workspace depends on this one.

pub mod error;
pub mod rbac;
pub mod resource;

pub use error::{ApiError, CacheError, ConfigError, DocketError, DocketResult, EnvelopeError};
pub use rbac::{permissions_for, Permission, Role, SecurityContext};
pub use resource::{ParseResourceError, RecordId, ResourceKind};
