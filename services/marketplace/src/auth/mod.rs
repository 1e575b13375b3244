//! Marketplace authentication.
//!
//! # Purpose
//! Groups password hashing, the session authenticator, and the middleware
//! that puts the resolved identity on each protected request.
pub mod middleware;
pub mod password;
pub mod session;
