//! Handles user authentication and tokens. Authentication is proven by possession of a signed
//! token; a verified token is turned into a [`UserGrant`], which is the only way for the rest of
//! the crate to act on behalf of a user.
//!
//! Tokens are compact JSON web tokens signed with HMAC-SHA256:
//! `base64url(header).base64url(payload).base64url(signature)`, without padding. There is no
//! revocation and no refresh; a token is valid until its `exp`.

use crate::{hex::Hex, seconds::Seconds, user};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("access denied")]
pub struct AccessDenied;

/// This grant represents a compile-time proof that the request is authenticated as a user.
#[derive(Debug)]
pub struct UserGrant {
    pub user_id: user::Id,
}

/// Secrets used to sign tokens and hash passwords.
#[derive(Clone)]
pub struct Keys {
    jwt_secret: String,
    password_salt: String,
    token_lifetime: Seconds,
}

impl Keys {
    pub fn new(jwt_secret: String, password_salt: String) -> Self {
        Self {
            jwt_secret,
            password_salt,
            token_lifetime: Seconds::one_week(),
        }
    }

    pub fn with_token_lifetime(mut self, lifetime: Seconds) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    pub(crate) fn sign(&self, user_id: user::Id) -> String {
        Token::sign(user_id, &self.jwt_secret, Utc::now(), self.token_lifetime)
    }

    pub(crate) fn verify(&self, token: &str) -> Result<Claims, AccessDenied> {
        Token::verify(token, &self.jwt_secret, Utc::now())
    }

    pub(crate) fn password_salt(&self) -> &str {
        &self.password_salt
    }
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keys")
            .field("token_lifetime", &self.token_lifetime)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    /// Issued at, in seconds since the epoch.
    pub iat: i64,
    /// Expiry, in seconds since the epoch.
    pub exp: i64,
}

pub struct Token;

impl Token {
    pub fn sign(user_id: user::Id, secret: &str, now: DateTime<Utc>, lifetime: Seconds) -> String {
        let header = Header {
            alg: ALGORITHM.to_owned(),
            typ: TOKEN_TYPE.to_owned(),
        };
        let claims = Claims {
            user_id: user_id.0,
            iat: now.timestamp(),
            exp: now.timestamp() + lifetime.0,
        };
        let header = encode_json(&header);
        let payload = encode_json(&claims);
        let signing_input = format!("{}.{}", header, payload);
        let signature = URL_SAFE_NO_PAD.encode(mac(secret, &signing_input).finalize().into_bytes());
        format!("{}.{}", signing_input, signature)
    }

    /// Checks the signature first, then the header and expiry. Every failure, including a token
    /// that doesn't parse, is reported as [`AccessDenied`].
    pub fn verify(token: &str, secret: &str, now: DateTime<Utc>) -> Result<Claims, AccessDenied> {
        let mut parts = token.split('.');
        let (header, payload, signature) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(AccessDenied),
            };
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| AccessDenied)?;
        mac(secret, &format!("{}.{}", header, payload))
            .verify_slice(&signature)
            .map_err(|_| AccessDenied)?;

        let header: Header = decode_json(header)?;
        if header.alg != ALGORITHM {
            return Err(AccessDenied);
        }
        let claims: Claims = decode_json(payload)?;
        if claims.exp <= now.timestamp() {
            return Err(AccessDenied);
        }
        Ok(claims)
    }
}

fn mac(secret: &str, input: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(input.as_bytes());
    mac
}

// Only used for plain structs of strings and integers, which always serialize.
fn encode_json<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_vec(value).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AccessDenied> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|_| AccessDenied)?;
    serde_json::from_slice(&bytes).map_err(|_| AccessDenied)
}

/// A salted hash of a user password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(Hex);

impl PasswordHash {
    /// SHA256 over the password followed by the deployment-wide salt.
    pub(crate) fn generate(password: &str, salt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(password);
        hasher.update(salt);
        Self(Hex::encode(&hasher.finalize()))
    }

    pub fn from_stored(hash: String) -> Self {
        Self(Hex::from_stored(hash))
    }

    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
