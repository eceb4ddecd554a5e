//! Registration and login. Both hand out a fresh token.

use rocket::{post, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use app::auth;

use super::user::UserModel;
use crate::{
    error::{self, JsonError, JsonResult},
    state::RocketState,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct SessionResponse {
    /// Bearer token for the `Authorization` header.
    token: String,
    user: UserModel,
}

impl SessionResponse {
    fn from_session(session: auth::Session) -> Self {
        Self {
            token: session.token,
            user: UserModel::from_entity(&session.user),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum Error {
    /// Unexpected error, please try again later.
    Unknown,
    /// A required field is missing or empty.
    MissingFields,
    /// The email address is not valid.
    InvalidEmail,
    /// The password is too short.
    PasswordTooShort,
    /// An account with this email already exists.
    UserAlreadyExists,
    /// Email or password is wrong.
    InvalidCredentials,
}

fn map_error(e: auth::Error) -> JsonError<Error> {
    match e {
        auth::Error::InvalidRegistration(inner) => {
            let error = match inner {
                app::user::InvalidRegistration::MissingFields => Error::MissingFields,
                app::user::InvalidRegistration::InvalidEmail => Error::InvalidEmail,
                app::user::InvalidRegistration::PasswordTooShort => Error::PasswordTooShort,
            };
            error::bad_request(error, inner.to_string())
        }
        auth::Error::UserAlreadyExists => error::bad_request(
            Error::UserAlreadyExists,
            "user already exists".to_owned(),
        ),
        auth::Error::InvalidCredentials => error::unauthorized(
            Error::InvalidCredentials,
            "invalid email or password".to_owned(),
        ),
        auth::Error::Database(e) => error::unexpected(Error::Unknown, e),
    }
}

/// Create an account and sign in.
#[openapi(tag = "Auth")]
#[post("/register", data = "<req>")]
pub(super) async fn register(
    state: &State<RocketState>,
    req: Json<RegisterRequest>,
) -> JsonResult<SessionResponse, Error> {
    let req = req.into_inner();
    auth::register(
        &state.db,
        &state.keys,
        req.name.as_deref().unwrap_or_default(),
        req.email.as_deref().unwrap_or_default(),
        req.password.as_deref().unwrap_or_default(),
    )
    .await
    .map(|session| Json(SessionResponse::from_session(session)))
    .map_err(map_error)
}

/// Sign in with email and password.
#[openapi(tag = "Auth")]
#[post("/login", data = "<req>")]
pub(super) async fn login(
    state: &State<RocketState>,
    req: Json<LoginRequest>,
) -> JsonResult<SessionResponse, Error> {
    let (email, password) = match (req.email.as_deref(), req.password.as_deref()) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => {
            return Err(error::bad_request(
                Error::MissingFields,
                "email and password are required".to_owned(),
            ))
        }
    };
    auth::login(&state.db, &state.keys, email, password)
        .await
        .map(|session| Json(SessionResponse::from_session(session)))
        .map_err(map_error)
}
