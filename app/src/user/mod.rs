use crate::{auth, concurrency, database::{self, Database}};
use thiserror::Error;

mod entities;

pub use entities::{Email, Id, InvalidRegistration, ReferralCode, User, WELCOME_TOKENS};

pub async fn get(grant: &auth::UserGrant, db: &Database) -> Result<Option<User>, sqlx::Error> {
    queries::get(db, grant.user_id).await
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("User being created already exists")]
    UserAlreadyExists,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const EMAIL_CONSTRAINT: &str = "users_email_key";
const REFERRAL_CODE_CONSTRAINT: &str = "users_referral_code_key";
const MAX_INSERT_ATTEMPTS: usize = 5;

/// Stores a new user. A clash on the randomly generated referral code is resolved by drawing a
/// new code; only a clash on the email means the user already exists.
pub(crate) async fn insert(db: &Database, user: &mut User) -> Result<(), Error> {
    for attempt in 1..=MAX_INSERT_ATTEMPTS {
        let e = match queries::insert(db, user).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        match database::unique_violation(&e) {
            Some(EMAIL_CONSTRAINT) => return Err(Error::UserAlreadyExists),
            Some(REFERRAL_CODE_CONSTRAINT) if attempt < MAX_INSERT_ATTEMPTS => {
                log::info!("referral code {:?} already taken, drawing a new one", user.referral_code);
                user.referral_code = ReferralCode::generate();
            }
            _ => return Err(Error::Database(e)),
        }
    }
    unreachable!("the last insert attempt always returns")
}

pub(crate) async fn find_by_email(db: &Database, email: &Email) -> Result<Option<User>, sqlx::Error> {
    queries::find_by_email(db, email).await
}

/// Marks the user premium and credits `tokens`. Fails with a conflict if the user's tokens changed
/// since the row was read inside `data_tx`.
pub(crate) async fn grant_premium(
    data_tx: &mut database::Transaction,
    id: Id,
    tokens: i64,
) -> Result<(), concurrency::Error> {
    let mut user = queries::get_in_tx(data_tx, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let previous = user.grant_premium(tokens);
    queries::update_premium(data_tx, &user, previous)
        .await?
        .ok_or(concurrency::ConflictError)?;
    log::info!("user {:?} is now premium with {} tokens", user.id, user.tokens);
    Ok(())
}

mod queries {
    use super::{Email, Id, ReferralCode, User};
    use crate::auth::PasswordHash;
    use crate::database::{self, Database};
    use chrono::{DateTime, Utc};
    use const_format::formatcp;
    use uuid::Uuid;

    const COLUMNS: &str =
        "id, name, email, password_hash, tokens, referral_code, is_premium, created";

    pub(super) async fn get(db: &Database, id: Id) -> Result<Option<User>, sqlx::Error> {
        Ok(
            sqlx::query_as::<_, UserRow>(formatcp!("SELECT {} FROM users WHERE id = $1", COLUMNS))
                .bind(id.0)
                .fetch_optional(db)
                .await?
                .map(|row| row.into_entity()),
        )
    }

    pub(super) async fn get_in_tx(
        data_tx: &mut database::Transaction,
        id: Id,
    ) -> Result<Option<User>, sqlx::Error> {
        Ok(sqlx::query_as::<_, UserRow>(formatcp!(
            "SELECT {} FROM users WHERE id = $1",
            COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&mut *data_tx)
        .await?
        .map(|row| row.into_entity()))
    }

    pub(super) async fn find_by_email(
        db: &Database,
        email: &Email,
    ) -> Result<Option<User>, sqlx::Error> {
        Ok(sqlx::query_as::<_, UserRow>(formatcp!(
            "SELECT {} FROM users WHERE email = $1",
            COLUMNS
        ))
        .bind(&email.0)
        .fetch_optional(db)
        .await?
        .map(|row| row.into_entity()))
    }

    pub(super) async fn insert(db: &Database, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(formatcp!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            COLUMNS
        ))
        .bind(user.id.0)
        .bind(&user.name)
        .bind(&user.email.0)
        .bind(user.password_hash.as_str())
        .bind(user.tokens)
        .bind(&user.referral_code.0)
        .bind(user.is_premium)
        .bind(user.created)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Returns `None` when another writer changed the token count first.
    pub(super) async fn update_premium(
        data_tx: &mut database::Transaction,
        user: &User,
        previous_tokens: i64,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        Ok(sqlx::query_as::<_, IdRow>(
            "UPDATE users SET tokens = $1, is_premium = $2 WHERE id = $3 AND tokens = $4 RETURNING id",
        )
        .bind(user.tokens)
        .bind(user.is_premium)
        .bind(user.id.0)
        .bind(previous_tokens)
        .fetch_optional(&mut *data_tx)
        .await?
        .map(|row| row.id))
    }

    #[derive(sqlx::FromRow, Debug)]
    struct IdRow {
        id: Uuid,
    }

    #[derive(sqlx::FromRow, Debug)]
    struct UserRow {
        id: Uuid,
        name: String,
        email: String,
        password_hash: String,
        tokens: i64,
        referral_code: String,
        is_premium: bool,
        created: DateTime<Utc>,
    }

    impl UserRow {
        fn into_entity(self) -> User {
            User {
                id: Id(self.id),
                name: self.name,
                email: Email(self.email),
                password_hash: PasswordHash::from_stored(self.password_hash),
                tokens: self.tokens,
                referral_code: ReferralCode(self.referral_code),
                is_premium: self.is_premium,
                created: self.created,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use uuid::Uuid;

    fn fresh_user() -> User {
        let email = format!("{}@example.com", Uuid::new_v4());
        User::register("Ada", &email, "secret1", "salt").unwrap()
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn taken_referral_code_is_replaced() {
        let db = database::test_database().await;
        let mut first = fresh_user();
        insert(&db, &mut first).await.unwrap();

        let mut second = fresh_user();
        second.referral_code = first.referral_code.clone();
        insert(&db, &mut second).await.unwrap();
        assert_ne!(second.referral_code, first.referral_code);

        let grant = auth::UserGrant { user_id: second.id };
        let stored = get(&grant, &db).await.unwrap().unwrap();
        assert_eq!(stored.referral_code, second.referral_code);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn taken_email_is_reported() {
        let db = database::test_database().await;
        let mut first = fresh_user();
        insert(&db, &mut first).await.unwrap();

        let mut again = User::register("Bob", &first.email.0, "secret2", "salt").unwrap();
        assert!(matches!(
            insert(&db, &mut again).await,
            Err(Error::UserAlreadyExists)
        ));
    }
}
