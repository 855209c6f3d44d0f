//! Access policies attached to routes.
//!
//! A policy is a typed value constructed once at route registration, not a
//! string parsed on every request. The string form (`Endpoint:GET:/api/x`)
//! survives only as an explicit parse for data-driven construction, and an
//! unknown name is an error, never a silent allow.

use thiserror::Error;

use crate::resolver::EndpointAuthorizer;

/// Prefix of the string form of endpoint policies.
pub const ENDPOINT_POLICY_PREFIX: &str = "Endpoint:";

/// What a route requires of its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Caller must carry the `HasAccess` boolean claim: the blanket
    /// "recognized application user" gate, independent of roles.
    HasAccess,
    /// Caller must carry the `IsSuperUser` boolean claim.
    SuperUser,
    /// Caller must hold one of the roles configured for this
    /// (method, route template) pair in the permission store.
    Endpoint { method: String, route: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyParseError {
    #[error("Unknown policy name '{0}'")]
    UnknownPolicy(String),

    #[error("Endpoint policy '{0}' must be 'Endpoint:{{METHOD}}:{{ROUTE}}'")]
    MalformedEndpointPolicy(String),
}

/// The caller's identity as the policy layer sees it: explicit inputs, never
/// ambient request state, so decisions stay unit-testable.
#[derive(Debug, Clone, Copy)]
pub struct CallerClaims<'a> {
    pub roles: &'a [String],
    pub has_access: bool,
    pub is_super_user: bool,
}

impl AccessPolicy {
    pub fn endpoint(method: impl Into<String>, route: impl Into<String>) -> Self {
        Self::Endpoint {
            method: method.into(),
            route: route.into(),
        }
    }

    /// Parse the string form. The route may itself contain colons; only the
    /// first two delimit.
    pub fn parse(name: &str) -> Result<Self, PolicyParseError> {
        match name {
            "HasAccess" => Ok(Self::HasAccess),
            "SuperUser" => Ok(Self::SuperUser),
            _ if name.starts_with(ENDPOINT_POLICY_PREFIX) => {
                let mut parts = name.splitn(3, ':');
                parts.next(); // "Endpoint"
                let method = parts.next().unwrap_or_default();
                let route = parts.next().unwrap_or_default();

                if method.is_empty() || route.is_empty() {
                    return Err(PolicyParseError::MalformedEndpointPolicy(name.to_string()));
                }

                Ok(Self::endpoint(method, route))
            }
            _ => Err(PolicyParseError::UnknownPolicy(name.to_string())),
        }
    }

    /// The string form, round-tripping with [`AccessPolicy::parse`].
    pub fn name(&self) -> String {
        match self {
            Self::HasAccess => "HasAccess".to_string(),
            Self::SuperUser => "SuperUser".to_string(),
            Self::Endpoint { method, route } => format!("{ENDPOINT_POLICY_PREFIX}{method}:{route}"),
        }
    }

    /// Decide access for one caller. `Endpoint` policies consult the
    /// resolver; the claim gates read only the supplied flags.
    pub async fn evaluate(
        &self,
        authorizer: &EndpointAuthorizer,
        caller: &CallerClaims<'_>,
    ) -> bool {
        match self {
            Self::HasAccess => caller.has_access,
            Self::SuperUser => caller.is_super_user,
            Self::Endpoint { method, route } => {
                authorizer.check_access(method, route, caller.roles).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_claim_policies() {
        assert_eq!(AccessPolicy::parse("HasAccess"), Ok(AccessPolicy::HasAccess));
        assert_eq!(AccessPolicy::parse("SuperUser"), Ok(AccessPolicy::SuperUser));
    }

    #[test]
    fn parses_endpoint_policy() {
        let policy = AccessPolicy::parse("Endpoint:GET:/api/documents/{id}").unwrap();
        assert_eq!(
            policy,
            AccessPolicy::endpoint("GET", "/api/documents/{id}")
        );
    }

    #[test]
    fn route_may_contain_colons() {
        let policy = AccessPolicy::parse("Endpoint:GET:/api/odd:route").unwrap();
        assert_eq!(policy, AccessPolicy::endpoint("GET", "/api/odd:route"));
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(
            AccessPolicy::parse("Whatever"),
            Err(PolicyParseError::UnknownPolicy("Whatever".to_string()))
        );
    }

    #[test]
    fn rejects_truncated_endpoint_policy() {
        assert!(matches!(
            AccessPolicy::parse("Endpoint:GET"),
            Err(PolicyParseError::MalformedEndpointPolicy(_))
        ));
        assert!(matches!(
            AccessPolicy::parse("Endpoint::"),
            Err(PolicyParseError::MalformedEndpointPolicy(_))
        ));
    }

    #[test]
    fn name_round_trips() {
        for policy in [
            AccessPolicy::HasAccess,
            AccessPolicy::SuperUser,
            AccessPolicy::endpoint("DELETE", "/api/documents/{id}"),
        ] {
            assert_eq!(AccessPolicy::parse(&policy.name()), Ok(policy));
        }
    }
}
