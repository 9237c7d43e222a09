//! The permission evaluator.
//!
//! One pure decision function over `(principal, action, resource snapshot)`.
//! The rule table below is preserved verbatim from the deployed policy,
//! uneven step-up requirements included; it is the source of truth, not a
//! pattern to normalize.
//!
//! | action                        | base rule                         | step-up |
//! |-------------------------------|-----------------------------------|---------|
//! | view metadata/content, download | super, admin, owner, or shared  | none    |
//! | list all files                | super or admin                    | admin (not super) |
//! | delete                        | owner only                        | owner, unless also super |
//! | lock / unlock                 | owner, admin, or super            | owner holding `user` or admin role; super exempt |
//! | create public share           | owner only                        | none    |
//!
//! A locked file refuses content access (`Download`, `ViewContent`) to
//! every caller, elevated roles included; only metadata stays visible so
//! owners can see the lock status.

use crate::principal::Principal;

/// Operations the evaluator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewMetadata,
    ViewContent,
    Download,
    Delete,
    Lock,
    Unlock,
    CreatePublicShare,
    ListAllFiles,
}

impl Action {
    /// Whether the action addresses one specific file. Everything except
    /// the bulk listing does.
    pub fn is_resource_scoped(&self) -> bool {
        !matches!(self, Action::ListAllFiles)
    }
}

/// Outcome of a permission evaluation.
///
/// `StepUpRequired` is not a refusal: the caller holds the right role but
/// must present higher assurance evidence and retry the same action. It is
/// kept distinct from `Deny` so the caller layer can trigger
/// re-authentication instead of treating the outcome as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    StepUpRequired,
    NotFound,
}

/// Snapshot of the targeted file as the evaluator needs to see it,
/// resolved for one specific caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceView {
    pub owner_id: String,
    pub locked: bool,
    /// A direct share to the calling principal exists for this file.
    pub shared_with_caller: bool,
}

/// Render a decision. Pure; consults nothing beyond its arguments.
///
/// For resource-scoped actions a missing resource settles to `NotFound`
/// before any role check, so unauthorized callers cannot probe for
/// existence beyond a uniform not-found.
pub fn evaluate(
    principal: &Principal,
    action: Action,
    resource: Option<&ResourceView>,
) -> Decision {
    match action {
        Action::ListAllFiles => list_all_decision(principal),
        _ => match resource {
            Some(resource) => resource_decision(principal, action, resource),
            None => Decision::NotFound,
        },
    }
}

fn list_all_decision(principal: &Principal) -> Decision {
    if principal.is_super() {
        Decision::Allow
    } else if principal.is_admin() {
        if principal.step_up_satisfied {
            Decision::Allow
        } else {
            Decision::StepUpRequired
        }
    } else {
        Decision::Deny
    }
}

fn resource_decision(principal: &Principal, action: Action, resource: &ResourceView) -> Decision {
    let owner = principal.owns(&resource.owner_id);
    let elevated = principal.is_admin() || principal.is_super();

    match action {
        Action::ViewMetadata | Action::ViewContent | Action::Download => {
            // Locking freezes content access absolutely; not even a
            // platform super reads a locked file's bytes.
            if resource.locked && !matches!(action, Action::ViewMetadata) {
                return Decision::Deny;
            }
            if owner || resource.shared_with_caller || elevated {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }
        Action::Delete => {
            if !owner {
                Decision::Deny
            } else if principal.is_super() || principal.step_up_satisfied {
                Decision::Allow
            } else {
                Decision::StepUpRequired
            }
        }
        Action::Lock | Action::Unlock => {
            if !(owner || elevated) {
                return Decision::Deny;
            }
            // Owners acting under a plain user or admin role need step-up
            // evidence to flip their own lock; supers are exempt.
            if owner
                && !principal.is_super()
                && (principal.is_plain_user() || principal.is_admin())
                && !principal.step_up_satisfied
            {
                Decision::StepUpRequired
            } else {
                Decision::Allow
            }
        }
        Action::CreatePublicShare => {
            if owner {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }
        // Bulk listing never reaches here; `evaluate` dispatches it first.
        Action::ListAllFiles => Decision::Deny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::{ROLE_PLATFORM_SUPER, ROLE_USER, ROLE_WORKSPACE_ADMIN};

    const OWNER_ID: &str = "owner-1";

    fn principal(subject: &str, roles: &[&str], step_up: bool) -> Principal {
        Principal {
            subject_id: subject.to_string(),
            username: subject.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            step_up_satisfied: step_up,
        }
    }

    fn file(locked: bool, shared_with_caller: bool) -> ResourceView {
        ResourceView {
            owner_id: OWNER_ID.to_string(),
            locked,
            shared_with_caller,
        }
    }

    #[test]
    fn missing_resource_is_not_found_before_role_checks() {
        let stranger = principal("someone", &[], false);
        let admin = principal("admin", &[ROLE_WORKSPACE_ADMIN], true);
        for action in [Action::ViewMetadata, Action::Download, Action::Delete, Action::Lock] {
            assert_eq!(evaluate(&stranger, action, None), Decision::NotFound);
            assert_eq!(evaluate(&admin, action, None), Decision::NotFound);
        }
    }

    #[test]
    fn read_access_for_owner_shared_and_elevated() {
        let owner = principal(OWNER_ID, &[ROLE_USER], false);
        let shared = principal("friend", &[ROLE_USER], false);
        let admin = principal("admin", &[ROLE_WORKSPACE_ADMIN], false);
        let super_user = principal("root", &[ROLE_PLATFORM_SUPER], false);

        let plain = file(false, false);
        let shared_view = file(false, true);
        for action in [Action::ViewMetadata, Action::ViewContent, Action::Download] {
            assert_eq!(evaluate(&owner, action, Some(&plain)), Decision::Allow);
            assert_eq!(evaluate(&shared, action, Some(&shared_view)), Decision::Allow);
            assert_eq!(evaluate(&admin, action, Some(&plain)), Decision::Allow);
            assert_eq!(evaluate(&super_user, action, Some(&plain)), Decision::Allow);
        }
    }

    /// No role and no relation never add up to an Allow.
    #[test]
    fn unrelated_principal_never_allowed() {
        let stranger = principal("someone", &[ROLE_USER], true);
        let view = file(false, false);
        for action in [
            Action::ViewMetadata,
            Action::ViewContent,
            Action::Download,
            Action::Delete,
            Action::Lock,
            Action::Unlock,
            Action::CreatePublicShare,
        ] {
            assert_eq!(evaluate(&stranger, action, Some(&view)), Decision::Deny);
        }
        assert_eq!(evaluate(&stranger, Action::ListAllFiles, None), Decision::Deny);
    }

    /// A locked file refuses content access to everyone, super included.
    #[test]
    fn lock_freezes_content_access_for_all_callers() {
        let locked = file(true, true);
        let owner = principal(OWNER_ID, &[ROLE_USER], true);
        let super_user = principal("root", &[ROLE_PLATFORM_SUPER], true);
        for p in [&owner, &super_user] {
            assert_eq!(evaluate(p, Action::Download, Some(&locked)), Decision::Deny);
            assert_eq!(evaluate(p, Action::ViewContent, Some(&locked)), Decision::Deny);
            // metadata stays visible so the lock state itself can be seen
            assert_eq!(evaluate(p, Action::ViewMetadata, Some(&locked)), Decision::Allow);
        }
    }

    #[test]
    fn delete_is_owner_only_even_for_super() {
        let super_user = principal("root", &[ROLE_PLATFORM_SUPER], true);
        assert_eq!(
            evaluate(&super_user, Action::Delete, Some(&file(false, false))),
            Decision::Deny
        );
    }

    #[test]
    fn delete_requires_step_up_unless_owner_is_super() {
        let view = file(false, false);
        let owner = principal(OWNER_ID, &[ROLE_USER], false);
        assert_eq!(evaluate(&owner, Action::Delete, Some(&view)), Decision::StepUpRequired);

        let owner_with_otp = principal(OWNER_ID, &[ROLE_USER], true);
        assert_eq!(evaluate(&owner_with_otp, Action::Delete, Some(&view)), Decision::Allow);

        let super_owner = principal(OWNER_ID, &[ROLE_PLATFORM_SUPER], false);
        assert_eq!(evaluate(&super_owner, Action::Delete, Some(&view)), Decision::Allow);
    }

    /// The owner's lock needs step-up until evidence
    /// arrives on a later request.
    #[test]
    fn owner_lock_requires_step_up_for_user_and_admin_roles() {
        let view = file(false, false);
        for roles in [&[ROLE_USER][..], &[ROLE_WORKSPACE_ADMIN][..]] {
            let owner = principal(OWNER_ID, roles, false);
            assert_eq!(evaluate(&owner, Action::Lock, Some(&view)), Decision::StepUpRequired);
            assert_eq!(evaluate(&owner, Action::Unlock, Some(&view)), Decision::StepUpRequired);

            let owner = principal(OWNER_ID, roles, true);
            assert_eq!(evaluate(&owner, Action::Lock, Some(&view)), Decision::Allow);
        }
    }

    #[test]
    fn super_owner_locks_without_step_up() {
        let owner = principal(OWNER_ID, &[ROLE_USER, ROLE_PLATFORM_SUPER], false);
        assert_eq!(evaluate(&owner, Action::Lock, Some(&file(false, false))), Decision::Allow);
    }

    #[test]
    fn non_owner_admin_locks_without_step_up() {
        let admin = principal("admin", &[ROLE_WORKSPACE_ADMIN], false);
        assert_eq!(evaluate(&admin, Action::Lock, Some(&file(false, false))), Decision::Allow);
        assert_eq!(evaluate(&admin, Action::Unlock, Some(&file(true, false))), Decision::Allow);
    }

    // Preserved policy quirk: an owner whose role set names none of the
    // recognized roles flips their own lock without step-up.
    #[test]
    fn unrecognized_role_owner_locks_without_step_up() {
        let owner = principal(OWNER_ID, &["compliance_viewer"], false);
        assert_eq!(evaluate(&owner, Action::Lock, Some(&file(false, false))), Decision::Allow);
    }

    #[test]
    fn list_all_requires_step_up_for_admin_but_not_super() {
        let user = principal("u", &[ROLE_USER], true);
        assert_eq!(evaluate(&user, Action::ListAllFiles, None), Decision::Deny);

        let admin = principal("a", &[ROLE_WORKSPACE_ADMIN], false);
        assert_eq!(evaluate(&admin, Action::ListAllFiles, None), Decision::StepUpRequired);

        let admin = principal("a", &[ROLE_WORKSPACE_ADMIN], true);
        assert_eq!(evaluate(&admin, Action::ListAllFiles, None), Decision::Allow);

        let super_user = principal("s", &[ROLE_PLATFORM_SUPER], false);
        assert_eq!(evaluate(&super_user, Action::ListAllFiles, None), Decision::Allow);
    }

    #[test]
    fn public_share_creation_is_owner_only() {
        let view = file(false, false);
        let owner = principal(OWNER_ID, &[ROLE_USER], false);
        assert_eq!(evaluate(&owner, Action::CreatePublicShare, Some(&view)), Decision::Allow);

        let admin = principal("admin", &[ROLE_WORKSPACE_ADMIN], true);
        assert_eq!(evaluate(&admin, Action::CreatePublicShare, Some(&view)), Decision::Deny);
    }
}
