use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::Responder,
    serde::json::Json,
    Request,
};
use thiserror::Error;

use crate::logging::RequestId;
use crate::model::response::ApiFailure;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Internal(_) => Status::InternalServerError,
            Self::BadRequest(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Status(status, _) => *status,
        }
    }

    /// The message shown to API clients. Server-side failures stay generic.
    fn public_message(&self) -> String {
        match self {
            Self::Db(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::BadRequest(msg) | Self::NotFound(msg) | Self::Status(_, msg) => msg.clone(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let id = RequestId::of(req);
        if status.class() == StatusClass::ServerError {
            error!("rsp{id} failed: {self}");
        } else {
            debug!("rsp{id} rejected: {self}");
        }
        (status, Json(ApiFailure::new(self.public_message()))).respond_to(req)
    }
}
