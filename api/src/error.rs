use rocket::{catch, http::Status, serde::json::Json, Request};
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt::Display;

#[derive(Debug, Serialize, JsonSchema)]
pub struct Error<E: Serialize> {
    pub error: Inner<E>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct Inner<E: Serialize> {
    pub code: u16,
    pub description: String,
    pub reason: Option<&'static str>,
    pub status: E,
}

impl<E: Serialize> Error<E> {
    fn new(http_status: Status, description: String, error: E) -> Self {
        Self {
            error: Inner {
                code: http_status.code,
                description,
                reason: http_status.reason(),
                status: error,
            },
        }
    }
}

pub type JsonError<E> = (Status, Json<Error<E>>);

pub type JsonResult<T, E> = Result<Json<T>, JsonError<E>>;

fn with_status<E: Serialize>(status: Status, error: E, description: String) -> JsonError<E> {
    (status, Json(Error::new(status, description, error)))
}

pub fn bad_request<E: Serialize>(error: E, description: String) -> JsonError<E> {
    with_status(Status::BadRequest, error, description)
}

pub fn unauthorized<E: Serialize>(error: E, description: String) -> JsonError<E> {
    with_status(Status::Unauthorized, error, description)
}

pub fn not_found<E: Serialize>(error: E, description: String) -> JsonError<E> {
    with_status(Status::NotFound, error, description)
}

pub fn internal_server_error<E: Serialize>(error: E, description: String) -> JsonError<E> {
    with_status(Status::InternalServerError, error, description)
}

/// Logs an unexpected failure and hides its details from the client.
pub fn unexpected<E: Serialize>(error: E, cause: impl Display) -> JsonError<E> {
    log::error!("unexpected error: {}", cause);
    internal_server_error(
        error,
        "something went wrong, please try again later".to_owned(),
    )
}

pub fn concurrency_error<E: Serialize>(error: E) -> JsonError<E> {
    internal_server_error(
        error,
        "a concurrency conflict could not be resolved, please try again".to_owned(),
    )
}

/// Status reported by the catcher, for failures that happen before a route runs.
#[derive(Debug, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestError {
    /// The request body or query could not be parsed, or has fields of the wrong type.
    BadRequest,
    /// Missing, invalid or expired bearer token.
    Unauthorized,
    /// No such route.
    NotFound,
    /// Too many requests, slow down.
    RateLimited,
    /// Unexpected error.
    Unknown,
}

impl RequestError {
    fn from_status(status: Status) -> Self {
        match status.code {
            400 | 422 => RequestError::BadRequest,
            401 | 403 => RequestError::Unauthorized,
            404 => RequestError::NotFound,
            429 => RequestError::RateLimited,
            _ => RequestError::Unknown,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            RequestError::BadRequest => "malformed request",
            RequestError::Unauthorized => "a valid bearer token is required",
            RequestError::NotFound => "not found",
            RequestError::RateLimited => "rate limit exceeded",
            RequestError::Unknown => "something went wrong, please try again later",
        }
    }
}

/// Renders every error Rocket produces on its own, e.g. from a failed guard, in the same JSON
/// envelope the routes use.
#[catch(default)]
pub fn default_catcher(status: Status, _req: &Request) -> JsonError<RequestError> {
    let error = RequestError::from_status(status);
    // Rocket rejects well-formed JSON of the wrong shape with 422; clients get 400 for any bad input.
    let status = match error {
        RequestError::BadRequest => Status::BadRequest,
        _ => status,
    };
    let description = error.description().to_owned();
    with_status(status, error, description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catcher_statuses_map_to_request_errors() {
        assert_eq!(
            RequestError::from_status(Status::Unauthorized),
            RequestError::Unauthorized
        );
        assert_eq!(
            RequestError::from_status(Status::TooManyRequests),
            RequestError::RateLimited
        );
        assert_eq!(
            RequestError::from_status(Status::UnprocessableEntity),
            RequestError::BadRequest
        );
        assert_eq!(
            RequestError::from_status(Status::ImATeapot),
            RequestError::Unknown
        );
    }

    #[test]
    fn envelope_carries_code_and_reason() {
        let (status, Json(body)) = bad_request("INVALID", "bad input".to_owned());
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body.error.code, 400);
        assert_eq!(body.error.reason, Some("Bad Request"));
        assert_eq!(body.error.description, "bad input");
        assert_eq!(body.error.status, "INVALID");
    }
}
