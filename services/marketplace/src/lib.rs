//! Marketplace service library crate.
//!
//! # Purpose
//! Exposes the marketplace API surface, session authentication, configuration,
//! image storage, and persistence backends for use by the binary and tests.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod images;
pub mod model;
pub mod observability;
pub mod store;
