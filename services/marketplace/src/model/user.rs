use duka_authz::{Lifecycle, Principal, Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A registered buyer or seller.
///
/// `password_hash` and `last_token` never leave the service.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub user_image: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_approved: bool,
    #[serde(skip)]
    pub last_token: Option<String>,
    pub date_joined: i64,
    pub last_logged_in: i64,
    pub last_interaction: i64,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal::new(self.user_id.clone(), Role::User, self.is_approved)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            active: true,
            approved: self.is_approved,
            deleted: false,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn public_view(&self) -> PublicSeller {
        PublicSeller {
            user_id: self.user_id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            location: self.location.clone(),
            user_image: self.user_image.clone(),
            date_joined: self.date_joined,
        }
    }

    pub fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(value) = patch.first_name {
            self.first_name = value;
        }
        if let Some(value) = patch.middle_name {
            self.middle_name = value;
        }
        if let Some(value) = patch.last_name {
            self.last_name = value;
        }
        if let Some(value) = patch.phone {
            self.phone = value;
        }
        if let Some(value) = patch.location {
            self.location = value;
        }
    }
}

/// Seller fields visible without authentication.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PublicSeller {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub user_image: String,
    pub date_joined: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.middle_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.location.is_none()
    }
}
