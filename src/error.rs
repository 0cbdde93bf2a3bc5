use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, status::Custom, Responder},
    serde::json::{serde_json::json, Json},
    Request,
};
use thiserror::Error;

use crate::engine::VoteError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// A 404 for the given missing thing.
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) => Status::BadRequest,
            Self::Vote(VoteError::AlreadyVoted) => Status::Conflict,
            Self::Vote(VoteError::ElectionClosed) => Status::Forbidden,
            Self::Vote(VoteError::InvalidSelection(_) | VoteError::NoCandidates) => {
                Status::UnprocessableEntity
            }
            Self::Status(status, _) => *status,
        }
    }

    /// Machine-readable reason code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Vote(vote_error) => vote_error.code(),
            Self::Db(_) => "database_error",
            Self::Jwt(_) => "bad_token",
            Self::Argon2(_) => "bad_password",
            Self::Status(status, _) => match status.code {
                400 => "bad_request",
                401 => "unauthorized",
                403 => "forbidden",
                404 => "not_found",
                409 => "conflict",
                _ => "error",
            },
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let message = match status.class() {
            StatusClass::ServerError => {
                // Don't leak database internals to the client.
                error!("{self}");
                "Internal server error".to_string()
            }
            _ => {
                if matches!(self, Self::Vote(VoteError::NoCandidates)) {
                    warn!("Vote submitted for a position with no candidates");
                } else {
                    debug!("{self}");
                }
                self.to_string()
            }
        };

        let body = json!({
            "code": self.code(),
            "message": message,
        });
        Custom(status, Json(body)).respond_to(req)
    }
}
