use serde::{Deserialize, Serialize};

use crate::model::{
    db::user::{NewUser, User},
    mongodb::{serde_hex, Id},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A user to register, as received from an administrator.
#[derive(Clone, Deserialize, Serialize)]
pub struct UserSpec {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_staff: bool,
}

impl TryFrom<UserSpec> for NewUser {
    type Error = String;

    /// Hash the password and build the user.
    /// The username must be non-empty and the password must meet minimum length.
    fn try_from(spec: UserSpec) -> Result<Self, Self::Error> {
        if spec.username.trim().is_empty() {
            return Err("Username must not be empty".to_string());
        }
        if spec.password.len() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            ));
        }
        NewUser::new(spec.username, spec.email, &spec.password, spec.is_staff)
            .map_err(|e| e.to_string())
    }
}

/// A user as shown to clients. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDesc {
    #[serde(with = "serde_hex")]
    pub id: Id,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
}

impl From<User> for UserDesc {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.user.username,
            email: user.user.email,
            is_staff: user.user.is_staff,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::db::user::EXAMPLE_PASSWORD;

    impl UserSpec {
        pub fn example() -> Self {
            Self {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                password: EXAMPLE_PASSWORD.to_string(),
                is_staff: false,
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "grace".to_string(),
                email: "grace@example.com".to_string(),
                password: EXAMPLE_PASSWORD.to_string(),
                is_staff: false,
            }
        }
    }
}
