use okapi::openapi3::{Object, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket::{
    async_trait,
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use rocket_okapi::{
    gen::OpenApiGenerator,
    request::{OpenApiFromRequest, RequestHeaderInput},
};
use thiserror::Error;

use crate::state::RocketState;

/// Guards routes that need a signed-in user.
pub struct UserGuard(app::auth::UserGrant);

impl UserGuard {
    pub fn grant(&self) -> &app::auth::UserGrant {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("access denied")]
    AccessDenied(#[from] app::auth::AccessDenied),
    #[error("rate limit exceeded")]
    RateLimited,
}

const AUTHORIZATION_HEADER: &str = "Authorization";
const SECURITY_SCHEME: &str = "BearerToken";

/// Extracts the token from an `Authorization: Bearer <token>` header value. The scheme is matched
/// case-insensitively.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for UserGuard {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = match req.headers().get_one(AUTHORIZATION_HEADER).and_then(bearer_token) {
            Some(token) => token,
            None => {
                return Outcome::Failure((Status::Unauthorized, app::auth::AccessDenied.into()))
            }
        };
        let state = match req.rocket().state::<RocketState>() {
            Some(state) => state,
            None => {
                log::error!("rocket state is not managed, this is a bug");
                return Outcome::Failure((Status::InternalServerError, app::auth::AccessDenied.into()));
            }
        };
        match app::auth::get_grant(&state.keys, token) {
            Ok(grant) => {
                if state.rate_limit.limit(grant.user_id) {
                    log::info!("rate limiting user {:?}", grant.user_id);
                    Outcome::Failure((Status::TooManyRequests, Error::RateLimited))
                } else {
                    Outcome::Success(Self(grant))
                }
            }
            Err(e) => Outcome::Failure((Status::Unauthorized, e.into())),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for UserGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(openapi_auth())
    }
}

fn openapi_auth() -> RequestHeaderInput {
    let security_scheme = SecurityScheme {
        description: Some(format!(
            "Requires a token from /register or /login in the \"{}\" header.",
            AUTHORIZATION_HEADER
        )),
        data: SecuritySchemeData::Http {
            scheme: "bearer".to_owned(),
            bearer_format: Some("JWT".to_owned()),
        },
        extensions: Object::default(),
    };
    let mut security_req = SecurityRequirement::new();
    security_req.insert(SECURITY_SCHEME.to_owned(), Vec::new());
    RequestHeaderInput::Security(SECURITY_SCHEME.to_owned(), security_scheme, security_req)
}

#[cfg(test)]
mod tests {
    use super::bearer_token;

    #[test]
    fn parses_bearer_headers() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token(""), None);
    }
}
