use sqlx::postgres::PgPoolOptions;
use url::Url;

pub use migrations::run_migrations;
pub use seeder::seed_development_data;

mod migrations;
mod seeder;

pub type Database = sqlx::Pool<sqlx::Postgres>;
pub(crate) type Transaction = sqlx::Transaction<'static, sqlx::Postgres>;

const UNIQUE_VIOLATION: &str = "23505";

pub async fn connect(url: &Url) -> Result<Database, sqlx::Error> {
    PgPoolOptions::new().connect(url.as_str()).await
}

/// The name of the violated constraint, if the error is a Postgres unique constraint violation.
pub(crate) fn unique_violation(e: &sqlx::Error) -> Option<&str> {
    match e {
        sqlx::Error::Database(e) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Some(e.constraint().unwrap_or_default())
        }
        _ => None,
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CountRow {
    pub count: i64,
}

/// Connects to `DATABASE_URL` and migrates it. Tests using this are `#[ignore]`d and need a
/// disposable Postgres database.
#[cfg(test)]
pub(crate) async fn test_database() -> Database {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point to a test database");
    let db = connect(&Url::parse(&url).expect("DATABASE_URL is not a valid url"))
        .await
        .expect("failed to connect to the test database");
    run_migrations(&db)
        .await
        .expect("failed to migrate the test database");
    db
}
