use app::{auth, content, database::Database, pricing};

use crate::rate_limit::RateLimit;

pub struct RocketState {
    pub db: Database,
    pub keys: auth::Keys,
    pub wallets: pricing::Wallets,
    pub content: content::Client,
    pub rate_limit: RateLimit,
}
