//! Ordered authorization rules.
//!
//! Each rule looks at the acting [`Principal`], the requested [`Action`] and
//! the [`Target`] and either passes or returns a [`DenyReason`]. Rules run in
//! the order of [`RULES`]; the first deny wins.
use crate::Principal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ApproveUser,
    RevokeUser,
    ApproveProduct,
    RegisterAdmin,
    ListAllSellers,
    ManageCategory,
    CreateProduct,
    UpdateProduct,
    ChangeProductState,
    CreateAdvert,
    UpdateAdvert,
    ChangeAdvertState,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::ApproveUser => "user.approve",
            Action::RevokeUser => "user.revoke",
            Action::ApproveProduct => "product.approve",
            Action::RegisterAdmin => "admin.register",
            Action::ListAllSellers => "seller.list_all",
            Action::ManageCategory => "category.manage",
            Action::CreateProduct => "product.create",
            Action::UpdateProduct => "product.update",
            Action::ChangeProductState => "product.state",
            Action::CreateAdvert => "advert.create",
            Action::UpdateAdvert => "advert.update",
            Action::ChangeAdvertState => "advert.state",
        }
    }

    pub fn admin_only(self) -> bool {
        matches!(
            self,
            Action::ApproveUser
                | Action::RevokeUser
                | Action::ApproveProduct
                | Action::RegisterAdmin
                | Action::ListAllSellers
                | Action::ManageCategory
        )
    }

    pub fn requires_ownership(self) -> bool {
        matches!(
            self,
            Action::UpdateProduct
                | Action::ChangeProductState
                | Action::UpdateAdvert
                | Action::ChangeAdvertState
        )
    }

    pub fn requires_approval(self) -> bool {
        matches!(self, Action::CreateProduct | Action::CreateAdvert)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an action is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    None,
    Owned { owner_id: String },
}

impl Target {
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Target::Owned {
            owner_id: owner_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AdminRequired,
    NotOwner,
    NotApproved,
}

impl DenyReason {
    /// Stable label used for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::AdminRequired => "admin_required",
            DenyReason::NotOwner => "not_owner",
            DenyReason::NotApproved => "not_approved",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            DenyReason::AdminRequired => "only admins can perform this action",
            DenyReason::NotOwner => "you can only modify resources you own",
            DenyReason::NotApproved => "your account has not been approved yet",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub type Rule = fn(&Principal, Action, &Target) -> Option<DenyReason>;

pub static RULES: &[(&str, Rule)] = &[
    ("admin_only", admin_only),
    ("owner_only", owner_only),
    ("approval_required", approval_required),
];

pub fn authorize(principal: &Principal, action: Action, target: &Target) -> Decision {
    RULES
        .iter()
        .find_map(|(_, rule)| rule(principal, action, target))
        .map_or(Decision::Allow, Decision::Deny)
}

fn admin_only(principal: &Principal, action: Action, _target: &Target) -> Option<DenyReason> {
    (action.admin_only() && !principal.is_admin()).then_some(DenyReason::AdminRequired)
}

fn owner_only(principal: &Principal, action: Action, target: &Target) -> Option<DenyReason> {
    if !action.requires_ownership() {
        return None;
    }
    match target {
        Target::Owned { owner_id } if *owner_id == principal.id => None,
        _ => Some(DenyReason::NotOwner),
    }
}

fn approval_required(
    principal: &Principal,
    action: Action,
    _target: &Target,
) -> Option<DenyReason> {
    (action.requires_approval() && !principal.approved).then_some(DenyReason::NotApproved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    const ADMIN_ONLY: [Action; 6] = [
        Action::ApproveUser,
        Action::RevokeUser,
        Action::ApproveProduct,
        Action::RegisterAdmin,
        Action::ListAllSellers,
        Action::ManageCategory,
    ];

    #[test]
    fn admin_only_actions_deny_users() {
        let approved_user = Principal::new("u1", Role::User, true);
        for action in ADMIN_ONLY {
            assert_eq!(
                authorize(&approved_user, action, &Target::None),
                Decision::Deny(DenyReason::AdminRequired),
                "{action}"
            );
        }
    }

    #[test]
    fn admin_only_actions_allow_admins() {
        let admin = Principal::new("a1", Role::Admin, false);
        for action in ADMIN_ONLY {
            assert!(authorize(&admin, action, &Target::None).is_allowed());
        }
    }

    #[test]
    fn owner_rule_compares_ids() {
        let owner = Principal::new("u1", Role::User, true);
        let stranger = Principal::new("u2", Role::User, true);
        let target = Target::owned_by("u1");

        assert!(authorize(&owner, Action::UpdateProduct, &target).is_allowed());
        assert_eq!(
            authorize(&stranger, Action::UpdateProduct, &target),
            Decision::Deny(DenyReason::NotOwner)
        );
        assert_eq!(
            authorize(&stranger, Action::ChangeAdvertState, &target),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn owner_rule_applies_to_admins_too() {
        let admin = Principal::new("a1", Role::Admin, true);
        assert_eq!(
            authorize(&admin, Action::ChangeProductState, &Target::owned_by("u1")),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn ownership_without_target_is_denied() {
        let owner = Principal::new("u1", Role::User, true);
        assert_eq!(
            authorize(&owner, Action::UpdateAdvert, &Target::None),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn creation_requires_approval() {
        let pending = Principal::new("u1", Role::User, false);
        let approved = Principal::new("u2", Role::User, true);
        assert_eq!(
            authorize(&pending, Action::CreateProduct, &Target::None),
            Decision::Deny(DenyReason::NotApproved)
        );
        assert!(authorize(&approved, Action::CreateAdvert, &Target::None).is_allowed());
    }

    #[test]
    fn first_matching_rule_wins() {
        // A pending user asking for an admin action is reported as an admin
        // failure, not an approval failure.
        let pending = Principal::new("u1", Role::User, false);
        assert_eq!(
            authorize(&pending, Action::ApproveProduct, &Target::None),
            Decision::Deny(DenyReason::AdminRequired)
        );
        let names: Vec<_> = RULES.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["admin_only", "owner_only", "approval_required"]);
    }
}
