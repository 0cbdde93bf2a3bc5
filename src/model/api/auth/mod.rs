mod request;
mod rights;
mod token;

pub use request::LoginRequest;
pub use rights::{Admin, Rights, Role, Voter};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
