use duka_authz::{Lifecycle, Target};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    /// Decimal string, e.g. `"1499.99"`.
    pub product_price: String,
    pub product_description: String,
    pub owner_id: String,
    pub main_image: String,
    pub quantity: i32,
    pub product_type: String,
    pub brand: String,
    pub category: String,
    pub sub_category: String,
    pub total_likes: i32,
    pub total_comments: i32,
    pub total_bookmarks: i32,
    pub total_interactions: i32,
    pub date_added: i64,
    pub last_updated: i64,
    pub is_active: bool,
    pub is_approved: bool,
    pub is_deleted: bool,
}

impl Product {
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            active: self.is_active,
            approved: self.is_approved,
            deleted: self.is_deleted,
        }
    }

    pub fn set_lifecycle(&mut self, state: Lifecycle) {
        self.is_active = state.active;
        self.is_approved = state.approved;
        self.is_deleted = state.deleted;
    }

    pub fn target(&self) -> Target {
        Target::owned_by(self.owner_id.clone())
    }

    /// Visible in the public catalogue.
    pub fn is_listed(&self) -> bool {
        self.is_approved && self.is_active && !self.is_deleted
    }

    pub fn apply_patch(&mut self, patch: ProductPatch) {
        if let Some(value) = patch.product_name {
            self.product_name = value;
        }
        if let Some(value) = patch.product_price {
            self.product_price = value;
        }
        if let Some(value) = patch.product_description {
            self.product_description = value;
        }
        if let Some(value) = patch.quantity {
            self.quantity = value;
        }
        if let Some(value) = patch.product_type {
            self.product_type = value;
        }
        if let Some(value) = patch.brand {
            self.brand = value;
        }
        if let Some(value) = patch.category {
            self.category = value;
        }
        if let Some(value) = patch.sub_category {
            self.sub_category = value;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub image_id: String,
    pub product_id: String,
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct ProductPatch {
    pub product_name: Option<String>,
    pub product_price: Option<String>,
    pub product_description: Option<String>,
    pub quantity: Option<i32>,
    pub product_type: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
}
