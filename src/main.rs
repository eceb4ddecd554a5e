use std::time::Duration;

use app::database::{self, run_migrations, seed_development_data};
use app::{auth, content, payment, pricing};
use rocket::figment::providers::Env;
use rocket::{launch, Build, Rocket};
use serde::Deserialize;
use url::Url;

const DEVELOPMENT_JWT_SECRET: &str = "satire-dev-jwt-secret-change-me";
const DEVELOPMENT_PASSWORD_SALT: &str = "satire-dev-salt-change-me";
const DEFAULT_AI_API_URL: &str = "https://openrouter.ai/api/v1/";

/// Plain environment variables read on top of Rocket's own configuration.
const ENV_VARS: &[&str] = &[
    "jwt_secret",
    "password_salt",
    "btc_wallet_address",
    "eth_wallet_address",
    "usdt_wallet_address",
    "ai_api_url",
    "ai_api_key",
];

#[derive(Debug, Deserialize)]
struct Config {
    database_url: Url,
    rate_limit: RateLimitConfig,
    jwt_secret: Option<String>,
    password_salt: Option<String>,
    btc_wallet_address: Option<String>,
    eth_wallet_address: Option<String>,
    usdt_wallet_address: Option<String>,
    ai_api_url: Option<Url>,
    ai_api_key: Option<String>,
}

impl Config {
    fn keys(&self) -> auth::Keys {
        auth::Keys::new(
            secret_or_default("JWT_SECRET", &self.jwt_secret, DEVELOPMENT_JWT_SECRET),
            secret_or_default("PASSWORD_SALT", &self.password_salt, DEVELOPMENT_PASSWORD_SALT),
        )
    }

    fn wallets(&self) -> pricing::Wallets {
        pricing::Wallets {
            btc: self.btc_wallet_address.clone(),
            eth: self.eth_wallet_address.clone(),
            usdt: self.usdt_wallet_address.clone(),
        }
    }

    fn content(&self) -> content::Config {
        content::Config {
            api_url: self.ai_api_url.clone().unwrap_or_else(|| {
                Url::parse(DEFAULT_AI_API_URL).expect("default AI API url is valid")
            }),
            api_key: self.ai_api_key.clone(),
        }
    }
}

fn secret_or_default(name: &str, value: &Option<String>, default: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => value.to_owned(),
        _ => {
            log::warn!("{} is not set, falling back to the development value", name);
            default.to_owned()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitConfig {
    limit: usize,
    span: Duration,
}

impl RateLimitConfig {
    fn into_rate_limit(self) -> api::RateLimit {
        api::RateLimit::new(self.limit, self.span)
    }
}

#[launch]
async fn rocket() -> _ {
    start_server().await
}

async fn start_server() -> Rocket<Build> {
    env_logger::init();

    let rocket = Rocket::build();
    let config: Config = rocket
        .figment()
        .clone()
        .merge(Env::raw().only(ENV_VARS))
        .extract()
        .expect("invalid configuration");

    let db = database::connect(&config.database_url)
        .await
        .expect("failed to connect to the database");
    let keys = config.keys();
    let wallets = config.wallets();
    let content = content::Client::new(config.content()).expect("failed to build the AI client");
    if !content.is_configured() {
        log::warn!("AI_API_KEY is not set, generated content will use fallbacks");
    }

    run_migrations(&db).await.expect("failed to run migrations");
    #[cfg(debug_assertions)]
    seed_development_data(&db, &keys)
        .await
        .expect("failed to seed development data");

    payment::start_worker(db.clone());

    api::register(
        rocket,
        db,
        keys,
        wallets,
        content,
        config.rate_limit.into_rate_limit(),
    )
}
