use duka_authz::Lifecycle;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Category {
    pub category_id: String,
    pub category_name: String,
    pub category_image: String,
    pub is_deleted: bool,
}

impl Category {
    /// Categories only soft-delete; they are never active or pending approval.
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            active: false,
            approved: true,
            deleted: self.is_deleted,
        }
    }
}
