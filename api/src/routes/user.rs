//! Routes for querying user information.

use chrono::{DateTime, Utc};
use rocket::{get, serde::json::Json, State};
use rocket_okapi::{openapi, JsonSchema};
use serde::Serialize;
use uuid::Uuid;

use app::user;

use crate::{
    access,
    error::{self, JsonResult},
    state::RocketState,
};

/// Public view of a user. The password hash never leaves the server.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserModel {
    id: Uuid,
    name: String,
    /// Registered user email.
    email: String,
    /// In-app token balance.
    tokens: i64,
    /// Code other readers can use to sign up through this user.
    referral_code: String,
    is_premium: bool,
    created_at: DateTime<Utc>,
}

impl UserModel {
    pub(super) fn from_entity(user: &user::User) -> Self {
        Self {
            id: user.id.0,
            name: user.name.clone(),
            email: user.email.0.clone(),
            tokens: user.tokens,
            referral_code: user.referral_code.0.clone(),
            is_premium: user.is_premium,
            created_at: user.created,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct UserResponse {
    user: UserModel,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum Error {
    /// Unexpected error, please try again later.
    Unknown,
    /// The token is valid but its user no longer exists.
    UserNotFound,
}

/// Get the signed-in user.
#[openapi(tag = "User")]
#[get("/get-user")]
pub(super) async fn get(
    guard: access::UserGuard,
    state: &State<RocketState>,
) -> JsonResult<UserResponse, Error> {
    match user::get(guard.grant(), &state.db).await {
        Ok(Some(user)) => Ok(Json(UserResponse {
            user: UserModel::from_entity(&user),
        })),
        Ok(None) => Err(error::not_found(
            Error::UserNotFound,
            "user not found".to_owned(),
        )),
        Err(e) => Err(error::unexpected(Error::Unknown, e)),
    }
}
