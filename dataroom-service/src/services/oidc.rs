//! Client for the external OIDC identity provider.
//!
//! Endpoints follow the Okta authorization-server layout under the issuer:
//! `/v1/authorize`, `/v1/token` and `/v1/userinfo`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{DecodingKey, Validation};
use rand::RngCore;
use reqwest::{header::ACCEPT, StatusCode, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

use crate::config::OidcConfig;

/// Scopes requested on every login.
pub const SCOPES: &str = "openid email profile groups";

/// Path the provider redirects back to, relative to the public base URL.
pub const CALLBACK_PATH: &str = "/api/auth/callback";

#[derive(Debug, Error)]
pub enum OidcError {
    #[error("invalid identity provider configuration: {0}")]
    InvalidConfig(String),

    #[error("request to {endpoint} endpoint failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} endpoint returned {status}")]
    ProviderStatus {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("failed to parse {endpoint} response: {source}")]
    InvalidResponse {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Everything needed to send the browser to the provider and to validate
/// the callback later.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: Url,
    /// Per-flow anti-forgery value echoed back by the provider.
    pub state: String,
    /// PKCE verifier matching the challenge embedded in `url`.
    pub code_verifier: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub sub: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Only present when the provider releases the `groups` claim here.
    #[serde(default)]
    pub groups: Option<Vec<String>>,
}

pub struct OidcClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: Secret<String>,
    required_group: String,
    authorize_url: Url,
    token_url: Url,
    userinfo_url: Url,
    redirect_uri: String,
}

impl OidcClient {
    pub fn new(config: &OidcConfig, public_base_url: &str) -> Result<Self, OidcError> {
        let issuer = config.issuer.trim_end_matches('/');
        let endpoint = |suffix: &str| {
            Url::parse(&format!("{}/v1/{}", issuer, suffix))
                .map_err(|e| OidcError::InvalidConfig(format!("issuer {}: {}", issuer, e)))
        };

        let base = Url::parse(public_base_url)
            .map_err(|e| OidcError::InvalidConfig(format!("public base URL: {}", e)))?;
        let redirect_uri = format!(
            "{}{}",
            base.as_str().trim_end_matches('/'),
            CALLBACK_PATH
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|e| OidcError::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: Secret::new(config.client_secret.expose_secret().clone()),
            required_group: config.required_group.clone(),
            authorize_url: endpoint("authorize")?,
            token_url: endpoint("token")?,
            userinfo_url: endpoint("userinfo")?,
            redirect_uri,
        })
    }

    /// Redirect URI registered with the provider; must match exactly.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn required_group(&self) -> &str {
        &self.required_group
    }

    /// Builds the provider authorization URL with a fresh state and PKCE pair.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let state = uuid::Uuid::new_v4().to_string();
        let code_verifier = {
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            URL_SAFE_NO_PAD.encode(bytes)
        };
        let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));

        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", &state)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256");

        AuthorizationRequest {
            url,
            state,
            code_verifier,
        }
    }

    /// Exchanges an authorization code for tokens. Client credentials go in
    /// the Basic authorization header.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, OidcError> {
        let response = self
            .http
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await
            .map_err(|source| {
                tracing::error!(error = %source, "Failed to reach token endpoint");
                OidcError::Transport {
                    endpoint: "token",
                    source,
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token exchange rejected by identity provider");
            return Err(OidcError::ProviderStatus {
                endpoint: "token",
                status,
            });
        }

        response.json::<TokenSet>().await.map_err(|source| {
            tracing::error!(error = %source, "Failed to parse token response");
            OidcError::InvalidResponse {
                endpoint: "token",
                source,
            }
        })
    }

    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfo, OidcError> {
        let response = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| {
                tracing::error!(error = %source, "Failed to reach userinfo endpoint");
                OidcError::Transport {
                    endpoint: "userinfo",
                    source,
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Userinfo request rejected by identity provider");
            return Err(OidcError::ProviderStatus {
                endpoint: "userinfo",
                status,
            });
        }

        response.json::<UserInfo>().await.map_err(|source| {
            tracing::error!(error = %source, "Failed to parse userinfo response");
            OidcError::InvalidResponse {
                endpoint: "userinfo",
                source,
            }
        })
    }

    pub fn is_member(&self, groups: &[String]) -> bool {
        groups.iter().any(|g| g == &self.required_group)
    }
}

/// Group membership for a login: the userinfo `groups` claim when present,
/// otherwise the `groups` claim of the ID token. An undecodable ID token
/// counts as no groups.
pub fn resolve_groups(userinfo: &UserInfo, id_token: Option<&str>) -> Vec<String> {
    if let Some(groups) = &userinfo.groups {
        return groups.clone();
    }

    let Some(id_token) = id_token else {
        tracing::debug!("No groups in userinfo and no ID token to fall back on");
        return Vec::new();
    };

    match groups_from_id_token(id_token) {
        Ok(groups) => {
            tracing::debug!(?groups, "Read groups from ID token");
            groups
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode ID token; treating as no groups");
            Vec::new()
        }
    }
}

/// Reads the `groups` claim from an ID token.
///
/// The signature is NOT verified. The token arrived over TLS straight from
/// the provider's token endpoint and is only consulted for group membership.
pub fn groups_from_id_token(id_token: &str) -> Result<Vec<String>, jsonwebtoken::errors::Error> {
    #[derive(Deserialize)]
    struct GroupsClaim {
        #[serde(default)]
        groups: Vec<String>,
    }

    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<GroupsClaim>(
        id_token,
        &DecodingKey::from_secret(&[]),
        &validation,
    )?;

    Ok(data.claims.groups)
}
