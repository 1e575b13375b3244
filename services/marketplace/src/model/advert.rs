use duka_authz::{Lifecycle, Target};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A main-page advertisement.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Advert {
    pub advert_id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub date_added: i64,
    pub last_updated: i64,
    pub is_active: bool,
    pub is_deleted: bool,
}

impl Advert {
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            active: self.is_active,
            approved: true,
            deleted: self.is_deleted,
        }
    }

    pub fn set_lifecycle(&mut self, state: Lifecycle) {
        self.is_active = state.active;
        self.is_deleted = state.deleted;
    }

    pub fn target(&self) -> Target {
        Target::owned_by(self.owner_id.clone())
    }

    pub fn is_listed(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    pub fn apply_patch(&mut self, patch: AdvertPatch) {
        if let Some(value) = patch.title {
            self.title = value;
        }
        if let Some(value) = patch.description {
            self.description = value;
        }
        if let Some(value) = patch.link {
            self.link = value;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct AdvertPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}
