//! Idempotent lifecycle transitions for marketplace resources.
//!
//! Products, adverts and user approvals all carry some subset of the
//! `active` / `approved` / `deleted` flags. [`plan`] decides whether a
//! requested [`Transition`] should be applied, is a no-op because the
//! resource is already in the target state, or is blocked by the current
//! state. Callers must not write to the store unless the plan is
//! [`TransitionPlan::Apply`].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lifecycle {
    pub active: bool,
    pub approved: bool,
    pub deleted: bool,
}

impl Lifecycle {
    /// Return the flags after `transition` has been applied.
    pub fn apply(self, transition: Transition) -> Self {
        let mut next = self;
        match transition {
            Transition::Activate => next.active = true,
            Transition::Deactivate => next.active = false,
            Transition::Approve => next.approved = true,
            Transition::Revoke => next.approved = false,
            Transition::Delete => next.deleted = true,
            Transition::Restore => next.deleted = false,
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activate,
    Deactivate,
    Approve,
    Revoke,
    Delete,
    Restore,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Activate => "activate",
            Transition::Deactivate => "deactivate",
            Transition::Approve => "approve",
            Transition::Revoke => "revoke",
            Transition::Delete => "delete",
            Transition::Restore => "restore",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnchangedReason {
    AlreadyActive,
    AlreadyInactive,
    AlreadyApproved,
    NotApproved,
    AlreadyDeleted,
    NotDeleted,
}

impl std::fmt::Display for UnchangedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnchangedReason::AlreadyActive => "is already active",
            UnchangedReason::AlreadyInactive => "is already inactive",
            UnchangedReason::AlreadyApproved => "is already approved",
            UnchangedReason::NotApproved => "is not approved",
            UnchangedReason::AlreadyDeleted => "is already deleted",
            UnchangedReason::NotDeleted => "is not deleted",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedReason {
    Deleted,
    StillActive,
}

impl std::fmt::Display for BlockedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BlockedReason::Deleted => "is deleted, restore it first",
            BlockedReason::StillActive => "is still active, deactivate it first",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    Apply,
    Unchanged(UnchangedReason),
    Blocked(BlockedReason),
}

pub fn plan(state: Lifecycle, transition: Transition) -> TransitionPlan {
    use BlockedReason as B;
    use TransitionPlan::{Apply, Blocked, Unchanged};
    use UnchangedReason as U;

    match transition {
        Transition::Activate if state.deleted => Blocked(B::Deleted),
        Transition::Activate if state.active => Unchanged(U::AlreadyActive),
        Transition::Deactivate if state.deleted => Blocked(B::Deleted),
        Transition::Deactivate if !state.active => Unchanged(U::AlreadyInactive),
        Transition::Approve if state.deleted => Blocked(B::Deleted),
        Transition::Approve if state.approved => Unchanged(U::AlreadyApproved),
        Transition::Revoke if !state.approved => Unchanged(U::NotApproved),
        Transition::Delete if state.active => Blocked(B::StillActive),
        Transition::Delete if state.deleted => Unchanged(U::AlreadyDeleted),
        Transition::Restore if !state.deleted => Unchanged(U::NotDeleted),
        _ => Apply,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(active: bool, approved: bool, deleted: bool) -> Lifecycle {
        Lifecycle {
            active,
            approved,
            deleted,
        }
    }

    #[test]
    fn repeat_transitions_are_unchanged() {
        let live = state(true, true, false);
        assert_eq!(
            plan(live, Transition::Approve),
            TransitionPlan::Unchanged(UnchangedReason::AlreadyApproved)
        );
        assert_eq!(
            plan(live, Transition::Activate),
            TransitionPlan::Unchanged(UnchangedReason::AlreadyActive)
        );
        assert_eq!(
            plan(live, Transition::Restore),
            TransitionPlan::Unchanged(UnchangedReason::NotDeleted)
        );
        assert_eq!(
            plan(state(false, false, false), Transition::Revoke),
            TransitionPlan::Unchanged(UnchangedReason::NotApproved)
        );
        assert_eq!(
            plan(state(false, false, true), Transition::Delete),
            TransitionPlan::Unchanged(UnchangedReason::AlreadyDeleted)
        );
    }

    #[test]
    fn delete_requires_deactivation() {
        let live = state(true, false, false);
        assert_eq!(
            plan(live, Transition::Delete),
            TransitionPlan::Blocked(BlockedReason::StillActive)
        );
        let inactive = live.apply(Transition::Deactivate);
        assert_eq!(plan(inactive, Transition::Delete), TransitionPlan::Apply);
        assert!(inactive.apply(Transition::Delete).deleted);
    }

    #[test]
    fn deleted_resources_block_activation_and_approval() {
        let gone = state(false, false, true);
        for transition in [
            Transition::Activate,
            Transition::Deactivate,
            Transition::Approve,
        ] {
            assert_eq!(
                plan(gone, transition),
                TransitionPlan::Blocked(BlockedReason::Deleted),
                "{transition}"
            );
        }
        assert_eq!(plan(gone, Transition::Restore), TransitionPlan::Apply);
    }

    #[test]
    fn applied_transitions_become_unchanged() {
        let transitions = [
            Transition::Activate,
            Transition::Deactivate,
            Transition::Approve,
            Transition::Revoke,
            Transition::Restore,
        ];
        for transition in transitions {
            let start = state(false, false, false).apply(Transition::Activate);
            let start = if transition == Transition::Activate {
                start.apply(Transition::Deactivate)
            } else if transition == Transition::Revoke {
                start.apply(Transition::Approve)
            } else if transition == Transition::Restore {
                start.apply(Transition::Deactivate).apply(Transition::Delete)
            } else {
                start
            };
            assert_eq!(plan(start, transition), TransitionPlan::Apply, "{transition}");
            let after = start.apply(transition);
            assert!(
                matches!(plan(after, transition), TransitionPlan::Unchanged(_)),
                "{transition}"
            );
        }
    }
}
