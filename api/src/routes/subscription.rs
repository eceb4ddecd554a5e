//! Premium status, as recorded locally.

use chrono::{DateTime, Utc};
use rocket::{get, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::Serialize;

use app::{payment, user};

use crate::{
    access,
    error::{self, JsonResult},
    state::RocketState,
};

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubscriptionResponse {
    is_premium: bool,
    /// Plan of the most recent confirmed payment.
    plan: Option<String>,
    /// When that payment was confirmed.
    since: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum Error {
    /// Unexpected error, please try again later.
    Unknown,
    /// The token is valid but its user no longer exists.
    UserNotFound,
}

/// Get the premium status of the signed-in user.
#[openapi(tag = "User")]
#[get("/get-subscription-status")]
pub(super) async fn get(
    guard: access::UserGuard,
    state: &State<RocketState>,
) -> JsonResult<SubscriptionResponse, Error> {
    let user = user::get(guard.grant(), &state.db)
        .await
        .map_err(|e| error::unexpected(Error::Unknown, e))?
        .ok_or_else(|| error::not_found(Error::UserNotFound, "user not found".to_owned()))?;
    let latest = payment::latest_confirmed(guard.grant(), &state.db)
        .await
        .map_err(|e| error::unexpected(Error::Unknown, e))?;
    Ok(Json(SubscriptionResponse {
        is_premium: user.is_premium,
        plan: latest
            .as_ref()
            .map(|payment| payment.plan.as_str().to_owned()),
        since: latest.and_then(|payment| match payment.status {
            payment::Status::Confirmed { timestamp } => Some(timestamp),
            _ => None,
        }),
    }))
}
