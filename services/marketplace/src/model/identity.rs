use crate::model::{Admin, User};
use duka_authz::Principal;

/// The record a verified session token resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(User),
    Admin(Admin),
}

impl Identity {
    pub fn id(&self) -> &str {
        match self {
            Identity::User(user) => &user.user_id,
            Identity::Admin(admin) => &admin.admin_id,
        }
    }

    pub fn principal(&self) -> Principal {
        match self {
            Identity::User(user) => user.principal(),
            Identity::Admin(admin) => admin.principal(),
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Identity::User(user) => Some(user),
            Identity::Admin(_) => None,
        }
    }

    pub fn as_admin(&self) -> Option<&Admin> {
        match self {
            Identity::Admin(admin) => Some(admin),
            Identity::User(_) => None,
        }
    }
}

/// A single-column update on a user or admin row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityField {
    /// Ignored for admins, who are always approved.
    Approved(bool),
    LastToken(Option<String>),
    LastLogin(i64),
}
