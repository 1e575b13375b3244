use duka_authz::{Principal, Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    #[default]
    Admin,
    SuperAdmin,
}

impl AdminRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::SuperAdmin => "super_admin",
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(AdminRole::Admin),
            "super_admin" => Ok(AdminRole::SuperAdmin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Admin {
    pub admin_id: String,
    pub admin_name: String,
    pub email: String,
    pub cell: String,
    pub admin_image: String,
    pub role: AdminRole,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub last_token: Option<String>,
    pub date_added: i64,
    pub last_logged_in: i64,
}

impl Admin {
    pub fn principal(&self) -> Principal {
        Principal::new(self.admin_id.clone(), Role::Admin, true)
    }

    pub fn apply_patch(&mut self, patch: AdminPatch) {
        if let Some(value) = patch.admin_name {
            self.admin_name = value;
        }
        if let Some(value) = patch.cell {
            self.cell = value;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct AdminPatch {
    pub admin_name: Option<String>,
    pub cell: Option<String>,
}
