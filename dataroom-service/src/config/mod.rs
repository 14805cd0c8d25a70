use reqwest::Url;
use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Process-wide configuration, built once at startup and handed to the
/// components that need it.
#[derive(Debug)]
pub struct DataroomConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// Externally reachable base URL; the OIDC redirect URI is derived from it.
    pub public_base_url: String,
    /// Absent only in `dev` when no identity provider is configured.
    pub oidc: Option<OidcConfig>,
    pub session: SessionConfig,
    pub mongodb: MongoConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        *self == Environment::Prod
    }
}

#[derive(Debug)]
pub struct OidcConfig {
    /// Authorization server issuer, e.g. `https://example.okta.com/oauth2/default`.
    pub issuer: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Group a principal must belong to before an admin account is provisioned.
    pub required_group: String,
    pub http_timeout_seconds: u64,
}

#[derive(Debug)]
pub struct SessionConfig {
    /// HMAC key for `payload-token` session JWTs.
    pub secret: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

pub const DEFAULT_REQUIRED_GROUP: &str = "Dataroom Admins";

impl DataroomConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment.is_production();

        let oidc = if !is_prod && env::var("OKTA_ISSUER").is_err() {
            None
        } else {
            Some(OidcConfig {
                issuer: get_env("OKTA_ISSUER", None, is_prod)?,
                client_id: get_env("OKTA_CLIENT_ID", None, is_prod)?,
                client_secret: Secret::new(get_env("OKTA_CLIENT_SECRET", None, is_prod)?),
                required_group: get_env(
                    "OKTA_REQUIRED_GROUP",
                    Some(DEFAULT_REQUIRED_GROUP),
                    false,
                )?,
                http_timeout_seconds: get_env("OKTA_HTTP_TIMEOUT_SECONDS", Some("10"), false)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "OKTA_HTTP_TIMEOUT_SECONDS: {}",
                            e
                        ))
                    })?,
            })
        };

        let config = DataroomConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("dataroom-service"), false)?,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            public_base_url: get_env("PUBLIC_BASE_URL", Some("http://localhost:8080"), is_prod)?,
            oidc,
            session: SessionConfig {
                secret: Secret::new(get_env("SESSION_SECRET", None, is_prod)?),
            },
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("dataroom"), is_prod)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        Url::parse(&self.public_base_url).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("PUBLIC_BASE_URL is not a valid URL: {}", e))
        })?;

        if let Some(oidc) = &self.oidc {
            Url::parse(&oidc.issuer).map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("OKTA_ISSUER is not a valid URL: {}", e))
            })?;

            if oidc.client_id.is_empty() || oidc.client_secret.expose_secret().is_empty() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "OKTA_CLIENT_ID and OKTA_CLIENT_SECRET must not be empty"
                )));
            }

            if oidc.http_timeout_seconds == 0 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "OKTA_HTTP_TIMEOUT_SECONDS must be positive"
                )));
            }
        }

        let secret_len = self.session.secret.expose_secret().len();
        if secret_len == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_SECRET must not be empty"
            )));
        }

        if self.environment.is_production() {
            if secret_len < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SESSION_SECRET must be at least 32 bytes in production"
                )));
            }

            if !self.public_base_url.starts_with("https://") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "PUBLIC_BASE_URL must use https in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
