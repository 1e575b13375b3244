//! Marketplace data model.
//!
//! # Purpose
//! Re-exports the identity, catalogue and advert records shared by the API and
//! store layers.
mod admin;
mod advert;
mod category;
mod identity;
mod product;
mod user;

pub use admin::{Admin, AdminPatch, AdminRole};
pub use advert::{Advert, AdvertPatch};
pub use category::Category;
pub use identity::{Identity, IdentityField};
pub use product::{Product, ProductImage, ProductPatch};
pub use user::{PublicSeller, User, UserPatch};
