use crate::{database::Database, user};
use thiserror::Error;

mod entities;

pub use entities::{AccessDenied, Claims, Keys, PasswordHash, Token, UserGrant};

/// A freshly issued token together with the user it belongs to.
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub user: user::User,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidRegistration(#[from] user::InvalidRegistration),
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<user::Error> for Error {
    fn from(e: user::Error) -> Self {
        match e {
            user::Error::UserAlreadyExists => Error::UserAlreadyExists,
            user::Error::Database(e) => Error::Database(e),
        }
    }
}

pub async fn register(
    db: &Database,
    keys: &Keys,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Session, Error> {
    let mut user = user::User::register(name, email, password, keys.password_salt())?;
    user::insert(db, &mut user).await?;
    log::info!("registered user {:?}", user.id);
    Ok(Session {
        token: keys.sign(user.id),
        user,
    })
}

pub async fn login(
    db: &Database,
    keys: &Keys,
    email: &str,
    password: &str,
) -> Result<Session, Error> {
    let user = user::find_by_email(db, &user::Email::normalize(email))
        .await?
        .filter(|user| user.has_password(password, keys.password_salt()))
        .ok_or(Error::InvalidCredentials)?;
    Ok(Session {
        token: keys.sign(user.id),
        user,
    })
}

/// Turns a bearer token into a grant. Only the signature and expiry are checked; whether the user
/// still exists is up to the caller.
pub fn get_grant(keys: &Keys, token: &str) -> Result<UserGrant, AccessDenied> {
    let claims = keys.verify(token)?;
    Ok(UserGrant {
        user_id: user::Id(claims.user_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seconds::Seconds;

    #[test]
    fn grants_come_from_valid_tokens_only() {
        let keys = Keys::new("secret".to_owned(), "salt".to_owned());
        let id = user::Id(uuid::Uuid::new_v4());
        let grant = get_grant(&keys, &keys.sign(id)).unwrap();
        assert_eq!(grant.user_id, id);

        let other = Keys::new("other".to_owned(), "salt".to_owned());
        assert_eq!(get_grant(&other, &keys.sign(id)).unwrap_err(), AccessDenied);

        let expired = keys.clone().with_token_lifetime(Seconds(0));
        assert_eq!(get_grant(&keys, &expired.sign(id)).unwrap_err(), AccessDenied);
    }
}
