use core::str::FromStr;

use serde::Serialize;

/// Role carried in session tokens.
///
/// Roles are a closed set: a token naming anything else fails to decode
/// (claims parse the name through [`FromStr`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Regular,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "Regular",
            Role::Admin => "Admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Regular" => Ok(Role::Regular),
            "Admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip_through_from_str() {
        for role in [Role::Regular, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn role_parsing_is_case_sensitive() {
        assert_eq!("admin".parse::<Role>(), Err(UnknownRole("admin".into())));
    }

    #[test]
    fn role_serializes_as_plain_name() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"Admin\"");
    }
}
