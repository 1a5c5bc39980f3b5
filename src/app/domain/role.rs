use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Role a principal holds within one company.
///
/// `User` is what a principal reports when it belongs to no company; it is
/// never stored on a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Member,
    Viewer,
    User,
}

impl Role {
    /// Highest-privilege role. Company owners always hold it.
    pub const OWNER: Role = Role::Admin;

    pub fn is_membership_role(self) -> bool {
        !matches!(self, Role::User)
    }

    /// Ordering used when one member edits another: nobody hands out or
    /// takes away a role above their own.
    pub fn rank(self) -> u8 {
        match self {
            Role::Admin => 4,
            Role::Manager => 3,
            Role::Member => 2,
            Role::Viewer => 1,
            Role::User => 0,
        }
    }
}
