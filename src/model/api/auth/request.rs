use serde::{Deserialize, Serialize};

/// Credentials submitted to sign in. Never stored: the password is plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}
