//! Verification outcomes as values.

use chrono::Duration;
use serde::{Serialize, Serializer};

use crate::{Identity, TokenErrorKind};

/// Notice attached to responses whose access token was silently replaced.
pub const REFRESH_NOTICE: &str =
    "Access token has been refreshed. Remember to copy the new one in the headers of subsequent calls";

/// Why a verification was granted or denied.
///
/// `Display` renders the client-facing cause string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCause {
    Authorized,
    /// One or both tokens absent.
    Unauthorized,
    /// Decoder failure other than the handled expiries.
    Token(TokenErrorKind),
    MissingInformation,
    /// Access and refresh tokens name different users.
    MismatchedUsers,
    RequestedUserMismatch,
    NotRegularUser,
    NotAdmin,
    NotInGroup,
    InvalidAuthType,
    /// Refresh token expired; the client must authenticate again.
    PerformLoginAgain,
    /// Every alternative failed (multi-mode verification).
    Any(Vec<AuthCause>),
}

impl AuthCause {
    /// Combine alternative failures, dropping duplicates and keeping order.
    pub fn any(causes: impl IntoIterator<Item = AuthCause>) -> Self {
        let mut unique: Vec<AuthCause> = Vec::new();
        for cause in causes {
            let flattened = match cause {
                AuthCause::Any(inner) => inner,
                other => vec![other],
            };
            for c in flattened {
                if !unique.contains(&c) {
                    unique.push(c);
                }
            }
        }

        if unique.len() == 1 {
            unique.remove(0)
        } else {
            AuthCause::Any(unique)
        }
    }

    /// Whether the client must log in again rather than retry.
    pub fn requires_login(&self) -> bool {
        match self {
            AuthCause::PerformLoginAgain => true,
            AuthCause::Any(causes) => causes.iter().any(AuthCause::requires_login),
            _ => false,
        }
    }
}

impl core::fmt::Display for AuthCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AuthCause::Authorized => f.write_str("Authorized"),
            AuthCause::Unauthorized => f.write_str("Unauthorized"),
            AuthCause::Token(kind) => f.write_str(kind.name()),
            AuthCause::MissingInformation => f.write_str("Token is missing information"),
            AuthCause::MismatchedUsers => f.write_str("Mismatched users"),
            AuthCause::RequestedUserMismatch => {
                f.write_str("Requested user different from the logged one")
            }
            AuthCause::NotRegularUser => f.write_str("Only regular users can access this resource"),
            AuthCause::NotAdmin => f.write_str("Not admin"),
            AuthCause::NotInGroup => f.write_str("User not in group"),
            AuthCause::InvalidAuthType => f.write_str("Invalid authType"),
            AuthCause::PerformLoginAgain => f.write_str("Perform login again"),
            AuthCause::Any(causes) => {
                for (i, cause) in causes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    core::fmt::Display::fmt(cause, f)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for AuthCause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Replacement access token minted on the refresh path.
///
/// The transport layer re-attaches `raw` to the response and surfaces `notice`.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub raw: String,
    pub ttl: Duration,
    pub notice: &'static str,
}

impl core::fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RefreshedToken")
            .field("raw", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("notice", &self.notice)
            .finish()
    }
}

/// Result of a verification: `{authorized, cause}` plus the optional refresh effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthDecision {
    authorized: bool,
    cause: AuthCause,

    #[serde(skip)]
    identity: Option<Identity>,

    #[serde(skip)]
    refreshed: Option<RefreshedToken>,
}

impl AuthDecision {
    pub fn granted(identity: Identity) -> Self {
        Self {
            authorized: true,
            cause: AuthCause::Authorized,
            identity: Some(identity),
            refreshed: None,
        }
    }

    pub fn granted_with_refresh(identity: Identity, refreshed: RefreshedToken) -> Self {
        Self {
            refreshed: Some(refreshed),
            ..Self::granted(identity)
        }
    }

    pub fn denied(cause: AuthCause) -> Self {
        Self {
            authorized: false,
            cause,
            identity: None,
            refreshed: None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn cause(&self) -> &AuthCause {
        &self.cause
    }

    /// Identity the capability was checked against (granted decisions only).
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn refreshed(&self) -> Option<&RefreshedToken> {
        self.refreshed.as_ref()
    }

    pub fn into_refreshed(self) -> Option<RefreshedToken> {
        self.refreshed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_deduplicates_and_joins_with_or() {
        let cause = AuthCause::any([
            AuthCause::MismatchedUsers,
            AuthCause::NotAdmin,
            AuthCause::MismatchedUsers,
        ]);
        assert_eq!(cause.to_string(), "Mismatched users or Not admin");
    }

    #[test]
    fn any_collapses_single_cause() {
        let cause = AuthCause::any([AuthCause::Unauthorized, AuthCause::Unauthorized]);
        assert_eq!(cause, AuthCause::Unauthorized);
    }

    #[test]
    fn decoder_causes_render_kind_name() {
        assert_eq!(
            AuthCause::Token(TokenErrorKind::InvalidSignature).to_string(),
            "InvalidSignature"
        );
    }

    #[test]
    fn decision_serializes_authorized_and_cause_only() {
        let json = serde_json::to_value(AuthDecision::denied(AuthCause::NotInGroup)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "authorized": false, "cause": "User not in group" })
        );
    }

    #[test]
    fn requires_login_looks_through_alternatives() {
        assert!(AuthCause::any([AuthCause::NotAdmin, AuthCause::PerformLoginAgain]).requires_login());
        assert!(!AuthCause::NotAdmin.requires_login());
    }
}
