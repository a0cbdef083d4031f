use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Capability levels, ordered: every role holds the capabilities of the
/// roles declared before it.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    User = 1,
    Admin = 2,
    Webmaster = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::User),
            2 => Some(Role::Admin),
            3 => Some(Role::Webmaster),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// True if this role carries the capabilities of `required`.
    pub fn allows(self, required: Role) -> bool {
        self >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webmaster_includes_admin_includes_user() {
        assert!(Role::Webmaster.allows(Role::Admin));
        assert!(Role::Webmaster.allows(Role::User));
        assert!(Role::Admin.allows(Role::User));
        assert!(!Role::User.allows(Role::Admin));
        assert!(!Role::Admin.allows(Role::Webmaster));
    }

    #[test]
    fn ids_and_names_map_back() {
        for role in [Role::User, Role::Admin, Role::Webmaster] {
            assert_eq!(Role::from_id(role.id()), Some(role));
            assert_eq!(role.as_ref().parse::<Role>().unwrap(), role);
        }
        assert_eq!(Role::from_id(9), None);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("supervisor".parse::<Role>().is_err());
    }
}
