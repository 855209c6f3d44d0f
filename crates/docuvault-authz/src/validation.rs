//! Validation rules for role grant submissions.

use std::collections::HashSet;
use thiserror::Error;

/// Longest role name the store accepts.
pub const MAX_ROLE_NAME_LEN: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleRuleViolation {
    #[error("At least one role is required")]
    EmptyRoleSet,

    #[error("Role names must not be empty or whitespace")]
    BlankRoleName,

    #[error("Role name '{0}' exceeds {MAX_ROLE_NAME_LEN} characters")]
    RoleNameTooLong(String),

    #[error("Duplicate role name '{0}'")]
    DuplicateRoleName(String),
}

/// Check a submitted role set against every rule, collecting all violations
/// rather than stopping at the first.
pub fn validate_role_names(roles: &[String]) -> Vec<RoleRuleViolation> {
    let mut violations = Vec::new();

    if roles.is_empty() {
        violations.push(RoleRuleViolation::EmptyRoleSet);
        return violations;
    }

    if roles.iter().any(|r| r.trim().is_empty()) {
        violations.push(RoleRuleViolation::BlankRoleName);
    }

    for role in roles {
        if role.chars().count() > MAX_ROLE_NAME_LEN {
            violations.push(RoleRuleViolation::RoleNameTooLong(role.clone()));
        }
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for role in roles {
        if !seen.insert(role.as_str()) && reported.insert(role.as_str()) {
            violations.push(RoleRuleViolation::DuplicateRoleName(role.clone()));
        }
    }

    violations
}
