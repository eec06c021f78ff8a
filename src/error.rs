use std::io::Error as IoError;

use jsonwebtoken::errors::Error as JwtError;
use log::{debug, error};
use mongodb::error::Error as DbError;
use reqwest::Error as HttpError;
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::{serde_json::Error as JsonError, Json},
    Request,
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Principal {0} is already registered")]
    AlreadyRegistered(String),
    #[error("Identity store already holds a credential for {0}")]
    AlreadyExists(String),
    #[error("The administrator must be enrolled before registering principals")]
    AdminNotEnrolled,
    #[error("Credential authority error: {0}")]
    Authority(String),
    #[error("Ledger already holds {0}")]
    ChaincodeAlreadyExists(String),
    #[error("Chaincode error: {0}")]
    Chaincode(String),
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("Ballot encryption failed: {0}")]
    Encryption(String),
    #[error("Ballot commitment does not match the recorded ciphertext")]
    IntegrityMismatch,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Timed out waiting for the {0}")]
    Timeout(&'static str),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Storage(#[from] IoError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error(transparent)]
    Http(#[from] HttpError),
}

/// The externally observable category of an [`Error`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    AlreadyRegistered,
    AlreadyExists,
    AdminNotEnrolled,
    AuthorityError,
    ChaincodeAlreadyExists,
    ChaincodeError,
    LedgerUnavailable,
    EncryptionError,
    IntegrityMismatch,
    NotFound,
    Timeout,
    BadRequest,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::AdminNotEnrolled => ErrorKind::AdminNotEnrolled,
            Self::Authority(_) => ErrorKind::AuthorityError,
            Self::ChaincodeAlreadyExists(_) => ErrorKind::ChaincodeAlreadyExists,
            Self::Chaincode(_) => ErrorKind::ChaincodeError,
            Self::LedgerUnavailable(_) => ErrorKind::LedgerUnavailable,
            Self::Encryption(_) => ErrorKind::EncryptionError,
            Self::IntegrityMismatch => ErrorKind::IntegrityMismatch,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::BadRequest(_) | Self::Json(_) => ErrorKind::BadRequest,
            Self::Storage(_) | Self::Db(_) | Self::Jwt(_) | Self::Http(_) => ErrorKind::Internal,
        }
    }

    /// The HTTP status this error maps to at the request boundary.
    pub fn status(&self) -> Status {
        match self.kind() {
            ErrorKind::Unauthenticated => Status::Unauthorized,
            ErrorKind::Forbidden => Status::Forbidden,
            ErrorKind::AlreadyRegistered
            | ErrorKind::AlreadyExists
            | ErrorKind::ChaincodeAlreadyExists => Status::Conflict,
            ErrorKind::AdminNotEnrolled | ErrorKind::LedgerUnavailable => {
                Status::ServiceUnavailable
            }
            ErrorKind::AuthorityError | ErrorKind::ChaincodeError => Status::BadGateway,
            ErrorKind::Timeout => Status::GatewayTimeout,
            ErrorKind::EncryptionError | ErrorKind::BadRequest => Status::BadRequest,
            ErrorKind::IntegrityMismatch => Status::UnprocessableEntity,
            ErrorKind::NotFound => Status::NotFound,
            ErrorKind::Internal => Status::InternalServerError,
        }
    }
}

/// Error body returned to API callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub kind: ErrorKind,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        // Infrastructure failures are not described to the caller.
        let message = match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        };
        let body = ErrorBody {
            success: false,
            kind: self.kind(),
            message,
        };
        (status, Json(body)).respond_to(req)
    }
}
