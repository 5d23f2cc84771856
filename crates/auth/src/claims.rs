use serde::{Deserialize, Deserializer, Serialize};

use crate::Role;

/// Identity carried by a session token (transport-agnostic).
///
/// Every field defaults when absent, `null` or empty on the wire; completeness
/// is checked by the verifier, not by decoding. A role name outside [`Role`]
/// still fails to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub role: Option<Role>,

    /// Opaque user id, copied verbatim into refreshed tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            role: Some(role),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// `username`, `email` and `role` are all present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.email.is_empty() && self.role.is_some()
    }

    /// Same user as `other`. The `id` is not compared.
    pub fn same_user(&self, other: &Identity) -> bool {
        self.username == other.username && self.email == other.email && self.role == other.role
    }
}

/// Decoded token claims: identity plus the JWT time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub identity: Identity,

    /// Issued-at (seconds since epoch).
    #[serde(default)]
    pub iat: i64,

    /// Expiration (seconds since epoch).
    pub exp: i64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(name) => name.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
