//! Session-token and authorization primitives for the duka marketplace.
//!
//! # Purpose
//! Centralizes the token format (HS256 session JWTs), the ordered
//! authorization rules, and the idempotent lifecycle transitions shared by
//! every marketplace handler.
//!
//! # How it fits
//! The marketplace service mints tokens on register/login with
//! [`TokenIssuer`], verifies them in its auth middleware with
//! [`TokenVerifier`], and consults [`authorize`] and [`lifecycle::plan`]
//! before mutating a resource.
//!
//! # Key invariants
//! - Tokens are HS256 only and always carry `sub`, `role`, `exp` and `jti`.
//! - Policy rules are evaluated in a fixed order; the first deny wins.
//! - Transitions into the current state are reported as unchanged, never as
//!   errors.
//!
//! # Examples
//! ```rust
//! use duka_authz::{Action, Decision, Principal, Role, Target, authorize};
//!
//! let seller = Principal::new("user-1", Role::User, true);
//! let decision = authorize(&seller, Action::ApproveUser, &Target::None);
//! assert!(matches!(decision, Decision::Deny(_)));
//! ```

mod errors;
pub mod lifecycle;
mod policy;
mod principal;
mod token;

pub use errors::{AuthzError, AuthzResult};
pub use lifecycle::{BlockedReason, Lifecycle, Transition, TransitionPlan, UnchangedReason};
pub use policy::{Action, Decision, DenyReason, RULES, Target, authorize};
pub use principal::{Principal, Role};
pub use token::{IssuedToken, SessionClaims, TokenIssuer, TokenVerifier, now_epoch_seconds};
