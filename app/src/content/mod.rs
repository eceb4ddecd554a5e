//! AI-generated satire. Every task is routed to a specialist model; when the provider can't be
//! used for any reason the task's fallback text is served instead, so generation never fails.

use chrono::Utc;
use std::str::FromStr;
use thiserror::Error;

mod client;
mod specialists;

pub use client::{Client, Config, Error as ClientError};
pub use specialists::{fallback, model};

/// Longest topic accepted from a user.
pub const MAX_TOPIC_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Headline,
    Article,
    Roast,
    Breaking,
}

impl Task {
    pub const ALL: [Task; 4] = [Task::Headline, Task::Article, Task::Roast, Task::Breaking];
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("unknown task {0:?}")]
    UnknownTask(String),
    #[error("topic is required")]
    EmptyTopic,
    #[error("topic is longer than {} characters", MAX_TOPIC_CHARS)]
    TopicTooLong,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "headline" => Ok(Task::Headline),
            "article" => Ok(Task::Article),
            "roast" => Ok(Task::Roast),
            "breaking" => Ok(Task::Breaking),
            _ => Err(Error::UnknownTask(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub content: String,
    /// The specialist the request was routed to.
    pub model: &'static str,
    /// True when `content` is the canned fallback rather than model output.
    pub fallback: bool,
}

pub fn validate_topic(topic: &str) -> Result<&str, Error> {
    let topic = topic.trim();
    if topic.is_empty() {
        Err(Error::EmptyTopic)
    } else if topic.chars().count() > MAX_TOPIC_CHARS {
        Err(Error::TopicTooLong)
    } else {
        Ok(topic)
    }
}

pub async fn generate(client: &Client, task: Task, topic: &str) -> Result<Generated, Error> {
    let topic = validate_topic(topic)?;
    let model = specialists::model(task, Utc::now());
    match client
        .complete(model, specialists::system_prompt(task), topic)
        .await
    {
        Ok(content) => Ok(Generated {
            content,
            model,
            fallback: false,
        }),
        Err(ClientError::NotConfigured) => {
            log::debug!("content provider not configured, serving {:?} fallback", task);
            Ok(fallback_for(task, model))
        }
        Err(e) => {
            log::warn!("{:?} generation with {} failed: {}", task, model, e);
            Ok(fallback_for(task, model))
        }
    }
}

fn fallback_for(task: Task, model: &'static str) -> Generated {
    Generated {
        content: specialists::fallback(task).to_owned(),
        model,
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn unconfigured() -> Client {
        Client::new(Config {
            api_url: Url::parse("http://127.0.0.1:9/v1/").unwrap(),
            api_key: None,
        })
        .unwrap()
    }

    #[test]
    fn parses_tasks() {
        assert_eq!("Roast".parse::<Task>(), Ok(Task::Roast));
        assert_eq!(" breaking ".parse::<Task>(), Ok(Task::Breaking));
        assert_eq!(
            "obituary".parse::<Task>(),
            Err(Error::UnknownTask("obituary".to_owned()))
        );
    }

    #[test]
    fn topics_are_trimmed_and_bounded() {
        assert_eq!(validate_topic("  toasters  "), Ok("toasters"));
        assert_eq!(validate_topic("   "), Err(Error::EmptyTopic));
        let long = "a".repeat(MAX_TOPIC_CHARS + 1);
        assert_eq!(validate_topic(&long), Err(Error::TopicTooLong));
        assert!(validate_topic(&"a".repeat(MAX_TOPIC_CHARS)).is_ok());
    }

    #[tokio::test]
    async fn unconfigured_provider_serves_fallback() {
        let generated = generate(&unconfigured(), Task::Headline, "toasters")
            .await
            .unwrap();
        assert!(generated.fallback);
        assert_eq!(generated.content, fallback(Task::Headline));
        assert!(!generated.model.is_empty());
    }

    #[tokio::test]
    async fn unreachable_provider_serves_fallback() {
        let client = Client::new(Config {
            api_url: Url::parse("http://127.0.0.1:9/v1/").unwrap(),
            api_key: Some("key".to_owned()),
        })
        .unwrap();
        let generated = generate(&client, Task::Roast, "my landlord").await.unwrap();
        assert!(generated.fallback);
        assert_eq!(generated.content, fallback(Task::Roast));
    }

    #[tokio::test]
    async fn invalid_topics_are_rejected_before_any_request() {
        assert_eq!(
            generate(&unconfigured(), Task::Article, "").await,
            Err(Error::EmptyTopic)
        );
    }
}
