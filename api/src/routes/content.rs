//! AI-generated satire.

use rocket::{post, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use app::content;

use crate::{
    access,
    error::{self, JsonError, JsonResult},
    state::RocketState,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct GenerateRequest {
    /// `headline`, `article`, `roast` or `breaking`.
    task: Option<String>,
    /// What the piece should be about; for a roast, the tea drop being roasted.
    topic: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct GenerateResponse {
    content: String,
    /// Model the task was routed to.
    model: String,
    /// True if the model could not be reached and canned content was served instead.
    fallback: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum Error {
    /// Task or topic missing from the request.
    MissingFields,
    /// The task does not exist.
    UnknownTask,
    /// The topic is empty.
    EmptyTopic,
    /// The topic is too long.
    TopicTooLong,
}

fn map_error(e: content::Error) -> JsonError<Error> {
    let error = match e {
        content::Error::UnknownTask(_) => Error::UnknownTask,
        content::Error::EmptyTopic => Error::EmptyTopic,
        content::Error::TopicTooLong => Error::TopicTooLong,
    };
    error::bad_request(error, e.to_string())
}

/// Generate a piece of satire with the specialist model for the task.
#[openapi(tag = "Content")]
#[post("/generate-content", data = "<req>")]
pub(super) async fn generate(
    state: &State<RocketState>,
    req: Json<GenerateRequest>,
    _guard: access::UserGuard,
) -> JsonResult<GenerateResponse, Error> {
    let (task, topic) = match (req.task.as_deref(), req.topic.as_deref()) {
        (Some(task), Some(topic)) => (task, topic),
        _ => {
            return Err(error::bad_request(
                Error::MissingFields,
                "task and topic are required".to_owned(),
            ))
        }
    };
    let task = content::Task::from_str(task).map_err(map_error)?;
    let generated = content::generate(&state.content, task, topic)
        .await
        .map_err(map_error)?;
    Ok(Json(GenerateResponse {
        content: generated.content,
        model: generated.model.to_owned(),
        fallback: generated.fallback,
    }))
}
