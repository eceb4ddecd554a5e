//! This library contains definitions for the API layer.

use app::{auth, content, database::Database, pricing};
use rocket::{Build, Rocket};
use state::RocketState;

mod access;
mod error;
mod rate_limit;
mod routes;
mod state;

pub use rate_limit::RateLimit;

pub fn register(
    rocket: Rocket<Build>,
    db: Database,
    keys: auth::Keys,
    wallets: pricing::Wallets,
    content: content::Client,
    rate_limit: RateLimit,
) -> Rocket<Build> {
    routes::register(
        rocket,
        RocketState {
            db,
            keys,
            wallets,
            content,
            rate_limit,
        },
    )
}
