use std::ops::{Deref, DerefMut};

use argon2::{Config as Argon2Config, Error as Argon2Error};
use mongodb::bson::doc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::mongodb::{Coll, Id},
    Config,
};

/// Core user data, as stored in the database.
///
/// Every user is a potential voter; staff users can additionally administer the election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
}

impl UserCore {
    /// Create a new user, hashing the given plaintext password.
    pub fn new(
        username: String,
        email: String,
        password: &str,
        is_staff: bool,
    ) -> Result<Self, Argon2Error> {
        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(password.as_bytes(), &salt, &Argon2Config::default())?;
        Ok(Self {
            username,
            email,
            password_hash,
            is_staff,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Ensure there is at least one staff user, creating the configured bootstrap
/// admin if there is none.
///
/// This operation is idempotent. Failing to hash the configured password is
/// an error, since the server would otherwise start with no way to administer it.
pub async fn ensure_admin_exists(users: &Coll<NewUser>, config: &Config) -> Result<()> {
    let staff = users
        .count_documents(doc! { "is_staff": true }, None)
        .await?;
    if staff > 0 {
        return Ok(());
    }

    let admin = NewUser::new(
        config.admin_username().to_string(),
        String::new(),
        config.admin_password(),
        true,
    )?;
    users.insert_one(admin, None).await?;
    warn!(
        "No staff users found; created bootstrap admin '{}'",
        config.admin_username()
    );
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    pub const EXAMPLE_PASSWORD: &str = "correct-horse-battery";

    impl UserCore {
        pub fn example() -> Self {
            Self::new(
                "ada".to_string(),
                "ada@example.com".to_string(),
                EXAMPLE_PASSWORD,
                false,
            )
            .unwrap()
        }

        pub fn example2() -> Self {
            Self::new(
                "grace".to_string(),
                "grace@example.com".to_string(),
                EXAMPLE_PASSWORD,
                false,
            )
            .unwrap()
        }

        pub fn example_staff() -> Self {
            Self::new(
                "returning-officer".to_string(),
                "officer@example.com".to_string(),
                EXAMPLE_PASSWORD,
                true,
            )
            .unwrap()
        }
    }
}

#[cfg(test)]
pub use examples::EXAMPLE_PASSWORD;
