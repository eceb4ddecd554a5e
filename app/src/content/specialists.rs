//! Routing of content tasks to specialist models. Each task has a short list of candidate models
//! and the hour of day picks one, so traffic alternates between them over the day.

use super::Task;
use chrono::{DateTime, Timelike, Utc};

struct Specialist {
    task: Task,
    models: &'static [&'static str],
    system_prompt: &'static str,
    fallback: &'static str,
}

const SPECIALISTS: &[Specialist] = &[
    Specialist {
        task: Task::Headline,
        models: &["openai/gpt-4o-mini", "anthropic/claude-3-haiku"],
        system_prompt: "You write a single satirical news headline about the topic. \
            Deadpan, under 15 words, no quotation marks, no explanation.",
        fallback: "Local Man Confident He Read Entire Article After Skimming Headline",
    },
    Specialist {
        task: Task::Article,
        models: &["anthropic/claude-3.5-sonnet", "openai/gpt-4o"],
        system_prompt: "You write short satirical news articles in the style of a wire \
            service report. Three paragraphs, straight-faced tone, invented quotes from \
            fictional officials of the Appliance Governance Council are welcome.",
        fallback: "Our correspondents are currently stuck in a meeting with the Appliance \
            Governance Council. The full story will be filed as soon as the toaster \
            finishes its opening remarks.",
    },
    Specialist {
        task: Task::Roast,
        models: &["google/gemini-flash-1.5", "mistralai/mistral-large"],
        system_prompt: "You respond to a reader's tea drop with a playful roast. Two or \
            three sentences, witty, never cruel, no slurs, no real people's private details.",
        fallback: "This tea is so lukewarm even the kettle filed a complaint.",
    },
    Specialist {
        task: Task::Breaking,
        models: &["openai/gpt-4o-mini", "google/gemini-flash-1.5"],
        system_prompt: "You write one breaking news ticker line about the topic, all in the \
            register of an overexcited cable news chyron. Under 20 words.",
        fallback: "BREAKING: Newsroom Coffee Machine Achieves Sentience, Demands Byline",
    },
];

fn lookup(task: Task) -> &'static Specialist {
    SPECIALISTS
        .iter()
        .find(|specialist| specialist.task == task)
        .unwrap_or(&SPECIALISTS[0])
}

/// The model that handles `task` at time `now`.
pub fn model(task: Task, now: DateTime<Utc>) -> &'static str {
    let models = lookup(task).models;
    models[now.hour() as usize % models.len()]
}

pub fn system_prompt(task: Task) -> &'static str {
    lookup(task).system_prompt
}

/// Text served when no model could be reached.
pub fn fallback(task: Task) -> &'static str {
    lookup(task).fallback
}
