use chrono::{DateTime, Utc};
use rand::{distributions::Uniform, Rng};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::PasswordHash;

/// In-app tokens granted to every new account.
pub const WELCOME_TOKENS: i64 = 10;

const MIN_PASSWORD_LENGTH: usize = 6;
const REFERRAL_CODE_LENGTH: usize = 8;
const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRegistration {
    #[error("name, email and password are required")]
    MissingFields,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be at least 6 characters")]
    PasswordTooShort,
}

/// Emails are compared after trimming and lower-casing, so `Bob@X.com ` and `bob@x.com` are the
/// same account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(pub String);

impl Email {
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    fn is_valid(&self) -> bool {
        match self.0.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
            None => false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(pub Uuid);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralCode(pub String);

impl ReferralCode {
    pub(crate) fn generate() -> Self {
        let alphabet = Uniform::from(0..REFERRAL_ALPHABET.len());
        let code = rand::thread_rng()
            .sample_iter(alphabet)
            .take(REFERRAL_CODE_LENGTH)
            .map(|i| REFERRAL_ALPHABET[i] as char)
            .collect();
        Self(code)
    }
}

#[derive(Debug)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub tokens: i64,
    pub referral_code: ReferralCode,
    pub is_premium: bool,
    pub created: DateTime<Utc>,
}

impl User {
    /// Validates registration input and builds a fresh, non-premium user.
    pub(crate) fn register(
        name: &str,
        email: &str,
        password: &str,
        salt: &str,
    ) -> Result<Self, InvalidRegistration> {
        let name = name.trim();
        let email = Email::normalize(email);
        if name.is_empty() || email.0.is_empty() || password.is_empty() {
            return Err(InvalidRegistration::MissingFields);
        }
        if !email.is_valid() {
            return Err(InvalidRegistration::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(InvalidRegistration::PasswordTooShort);
        }
        Ok(Self {
            id: Id(Uuid::new_v4()),
            name: name.to_owned(),
            email,
            password_hash: PasswordHash::generate(password, salt),
            tokens: WELCOME_TOKENS,
            referral_code: ReferralCode::generate(),
            is_premium: false,
            created: Utc::now(),
        })
    }

    pub(crate) fn has_password(&self, password: &str, salt: &str) -> bool {
        self.password_hash == PasswordHash::generate(password, salt)
    }

    /// Upgrades the user to premium and adds the plan's tokens. Returns the previous token count,
    /// which the update query uses to detect concurrent modifications.
    pub(crate) fn grant_premium(&mut self, tokens: i64) -> i64 {
        let previous = self.tokens;
        self.tokens += tokens;
        self.is_premium = true;
        previous
    }
}
