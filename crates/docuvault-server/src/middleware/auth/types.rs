//! Authentication types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Assigned role names.
    pub roles: Vec<String>,
    /// Baseline application access claim.
    pub has_access: bool,
    /// Administrative override claim.
    pub is_super_user: bool,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// JWT ID.
    pub jti: String,
}

impl Claims {
    /// Create claims for a regular user with the given roles.
    pub fn new(user_id: Uuid, name: &str, roles: Vec<String>, expires_in: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            name: name.to_string(),
            roles,
            has_access: true,
            is_super_user: false,
            iat: now,
            exp: now + expires_in,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Create claims carrying the administrative override.
    pub fn new_super_user(user_id: Uuid, name: &str, expires_in: i64) -> Self {
        let mut claims = Self::new(user_id, name, Vec::new(), expires_in);
        claims.is_super_user = true;
        claims
    }

    /// Get user ID as UUID.
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// Check if token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Authenticated user context, inserted into request extensions by the
/// auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub roles: Vec<String>,
    pub has_access: bool,
    pub is_super_user: bool,
}

impl AuthUser {
    /// Create from claims. Fails when the subject is not a UUID.
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let id = claims.user_id()?;
        Some(Self {
            id,
            name: claims.name.clone(),
            roles: claims.roles.clone(),
            has_access: claims.has_access,
            is_super_user: claims.is_super_user,
        })
    }

    /// Caller view consumed by policy evaluation.
    pub fn caller_claims(&self) -> docuvault_authz::CallerClaims<'_> {
        docuvault_authz::CallerClaims {
            roles: &self.roles,
            has_access: self.has_access,
            is_super_user: self.is_super_user,
        }
    }
}
