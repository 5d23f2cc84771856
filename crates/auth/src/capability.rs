//! What a caller asks the verifier to prove about a session.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{AuthCause, Identity, Role};

/// Requested capability, checked against the verified identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Any valid, consistent token pair.
    Simple,

    /// Acting as this exact regular user. Admins do not qualify.
    User(String),

    Admin,

    /// Identity email must be one of these member emails.
    Group(BTreeSet<String>),
}

impl Capability {
    pub fn user(username: impl Into<String>) -> Self {
        Capability::User(username.into())
    }

    pub fn group<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Capability::Group(emails.into_iter().map(Into::into).collect())
    }

    /// Resolve `group_name` and build the matching `Group` capability.
    pub fn for_group<R>(resolver: &R, group_name: &str) -> Result<Self, GroupNotFound>
    where
        R: GroupMembershipResolver + ?Sized,
    {
        resolver
            .member_emails(group_name)
            .map(Capability::Group)
            .ok_or_else(|| GroupNotFound(group_name.to_string()))
    }

    /// Build a capability from a string `authType` descriptor.
    ///
    /// Unknown tags and tags missing their payload map to `InvalidAuthType`.
    pub fn from_tag(
        tag: &str,
        username: Option<&str>,
        group_emails: Option<&[String]>,
    ) -> Result<Self, AuthCause> {
        match (tag, username, group_emails) {
            ("Simple", _, _) => Ok(Capability::Simple),
            ("Admin", _, _) => Ok(Capability::Admin),
            ("User", Some(username), _) => Ok(Capability::user(username)),
            ("Group", _, Some(emails)) => Ok(Capability::group(emails.iter().cloned())),
            _ => Err(AuthCause::InvalidAuthType),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Simple => "Simple",
            Capability::User(_) => "User",
            Capability::Admin => "Admin",
            Capability::Group(_) => "Group",
        }
    }

    /// Evaluate the predicate against an already verified identity.
    pub fn check(&self, identity: &Identity) -> Result<(), AuthCause> {
        match self {
            Capability::Simple => Ok(()),
            Capability::User(username) => {
                if identity.username != *username {
                    Err(AuthCause::RequestedUserMismatch)
                } else if identity.role != Some(Role::Regular) {
                    Err(AuthCause::NotRegularUser)
                } else {
                    Ok(())
                }
            }
            Capability::Admin => match identity.role {
                Some(Role::Admin) => Ok(()),
                _ => Err(AuthCause::NotAdmin),
            },
            Capability::Group(emails) => {
                if emails.contains(&identity.email) {
                    Ok(())
                } else {
                    Err(AuthCause::NotInGroup)
                }
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("group '{0}' not found")]
pub struct GroupNotFound(pub String);

/// Group-by-name lookup owned by the business layer.
///
/// The verifier never calls this itself; callers resolve the member set up
/// front and report unknown groups before verification.
pub trait GroupMembershipResolver: Send + Sync {
    fn member_emails(&self, group_name: &str) -> Option<BTreeSet<String>>;
}
