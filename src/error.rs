use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use thiserror::Error;

use crate::logging::RequestId;
use crate::model::api::envelope::Envelope;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(String),
    #[error("User already registered for this election")]
    AlreadyRegistered,
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::AlreadyRegistered | Self::InvalidState(_) | Self::BadRequest(_) => {
                Status::BadRequest
            }
            Self::Unauthorized(_) | Self::Jwt(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::Store(_) | Self::Internal(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let envelope = if status == Status::InternalServerError {
            let id = req.local_cache(RequestId::next);
            error!("req{id} failed: {self}");
            Envelope::failure("Server error", Some(self.to_string()))
        } else {
            Envelope::failure(self.to_string(), None)
        };
        (status, Json(envelope)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(Error::not_found("Election").status(), Status::NotFound);
        assert_eq!(Error::AlreadyRegistered.status(), Status::BadRequest);
        assert_eq!(
            Error::InvalidState("published".to_string()).status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::Forbidden("admin".to_string()).status(),
            Status::Forbidden
        );
        assert_eq!(
            Error::Internal("oops".to_string()).status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn messages() {
        assert_eq!(Error::not_found("Election").to_string(), "Election not found");
        assert_eq!(
            Error::AlreadyRegistered.to_string(),
            "User already registered for this election"
        );
    }
}
