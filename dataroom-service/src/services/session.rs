use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServiceError;
use crate::config::SessionConfig;
use crate::models::{AuthProvider, User};

/// Name of the session cookie read by the CMS and by this service.
pub const SESSION_COOKIE: &str = "payload-token";

/// Session lifetime: 7 days.
pub const SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

const SESSION_COLLECTION: &str = "users";

/// Claims carried by the `payload-token` JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// Account collection the subject belongs to
    pub collection: String,
    pub auth_provider: AuthProvider,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Mints and verifies session tokens and builds the cookies that carry them.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    secure_cookies: bool,
}

impl SessionIssuer {
    pub fn new(config: &SessionConfig, secure_cookies: bool) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            secure_cookies,
        }
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Issues a session for an account whose credential lives with the
    /// external identity provider. No password is involved; accounts with a
    /// local credential are refused.
    pub fn issue(&self, user: &User) -> Result<String, ServiceError> {
        if !user.is_externally_managed() {
            return Err(ServiceError::NotExternallyManaged);
        }

        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            collection: SESSION_COLLECTION.to_string(),
            auth_provider: user.auth_provider,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(SESSION_TTL_SECONDS)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        let validation = Validation::new(Algorithm::HS256);
        Ok(decode::<SessionClaims>(token, &self.decoding_key, &validation)?.claims)
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Strict)
            .max_age(time::Duration::seconds(SESSION_TTL_SECONDS))
            .build()
    }

    /// Cookie that tells the browser to drop the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Strict)
            .max_age(time::Duration::ZERO)
            .build()
    }
}
