use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::db::user::UserCore;

/// Different privilege levels. Higher levels include everything below them.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Rights {
    /// The rights a user currently holds.
    pub fn of(user: &UserCore) -> Self {
        if user.is_staff {
            Self::Admin
        } else {
            Self::Voter
        }
    }
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// A role a route can demand of the caller.
pub trait Role {
    /// The minimum rights needed to act in this role.
    const RIGHTS: Rights;
}

/// Any signed-in user.
pub struct Voter;

impl Role for Voter {
    const RIGHTS: Rights = Rights::Voter;
}

/// A staff user.
pub struct Admin;

impl Role for Admin {
    const RIGHTS: Rights = Rights::Admin;
}
