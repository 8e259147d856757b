use serde::Deserialize;
use std::env;

use crate::services::error::AuthzError;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub redis: RedisConfig,
    pub token: TokenConfig,
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Token format and lifetime settings.
///
/// The format is a process-wide choice: the codec is constructed once from
/// `mode` and injected into the token service, never branched per call.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub mode: TokenMode,
    /// Symmetric secret for the signed-claim format.
    pub signing_secret: String,
    /// RSA key pair (PEM paths) for the sealed-claim format.
    pub private_key_path: String,
    pub public_key_path: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TokenMode {
    /// HMAC-signed claims, symmetric secret.
    Signed,
    /// Encrypted claims, RSA key pair.
    Sealed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Ceiling on directory lookups during permission resolution.
    pub lookup_timeout_ms: u64,
    /// TTL for cached effective permission sets.
    pub permission_cache_ttl_seconds: i64,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, AuthzError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AuthzError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = EngineConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("authz-engine"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            redis: RedisConfig {
                url: get_env("REDIS_URL", None, is_prod)?,
            },
            token: TokenConfig {
                mode: get_env("TOKEN_MODE", Some("signed"), is_prod)?
                    .parse()
                    .map_err(|e: String| AuthzError::ConfigError(anyhow::anyhow!(e)))?,
                signing_secret: get_env("TOKEN_SIGNING_SECRET", None, is_prod)?,
                private_key_path: get_env("TOKEN_PRIVATE_KEY_PATH", Some(""), is_prod)?,
                public_key_path: get_env("TOKEN_PUBLIC_KEY_PATH", Some(""), is_prod)?,
                access_token_expiry_minutes: parse_env(
                    "TOKEN_ACCESS_EXPIRY_MINUTES",
                    Some("15"),
                    is_prod,
                )?,
                refresh_token_expiry_days: parse_env(
                    "TOKEN_REFRESH_EXPIRY_DAYS",
                    Some("7"),
                    is_prod,
                )?,
            },
            resolver: ResolverConfig {
                lookup_timeout_ms: parse_env("RESOLVER_LOOKUP_TIMEOUT_MS", Some("2000"), is_prod)?,
                permission_cache_ttl_seconds: parse_env(
                    "RESOLVER_CACHE_TTL_SECONDS",
                    Some("300"),
                    is_prod,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AuthzError> {
        if self.token.access_token_expiry_minutes <= 0 {
            return Err(AuthzError::ConfigError(anyhow::anyhow!(
                "TOKEN_ACCESS_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.token.refresh_token_expiry_days <= 0 {
            return Err(AuthzError::ConfigError(anyhow::anyhow!(
                "TOKEN_REFRESH_EXPIRY_DAYS must be positive"
            )));
        }

        if self.resolver.lookup_timeout_ms == 0 {
            return Err(AuthzError::ConfigError(anyhow::anyhow!(
                "RESOLVER_LOOKUP_TIMEOUT_MS must be positive"
            )));
        }

        // Redis rejects SET ... EX with a non-positive TTL.
        if self.resolver.permission_cache_ttl_seconds <= 0 {
            return Err(AuthzError::ConfigError(anyhow::anyhow!(
                "RESOLVER_CACHE_TTL_SECONDS must be positive"
            )));
        }

        match self.token.mode {
            TokenMode::Signed => {
                if self.token.signing_secret.len() < 32 {
                    return Err(AuthzError::ConfigError(anyhow::anyhow!(
                        "TOKEN_SIGNING_SECRET must be at least 32 bytes"
                    )));
                }
            }
            TokenMode::Sealed => {
                if self.token.private_key_path.is_empty() || self.token.public_key_path.is_empty()
                {
                    return Err(AuthzError::ConfigError(anyhow::anyhow!(
                        "TOKEN_PRIVATE_KEY_PATH and TOKEN_PUBLIC_KEY_PATH are required in sealed mode"
                    )));
                }
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AuthzError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AuthzError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AuthzError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AuthzError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?.parse().map_err(|e: T::Err| {
        AuthzError::ConfigError(anyhow::anyhow!(format!("{}: {}", key, e)))
    })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for TokenMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "signed" => Ok(TokenMode::Signed),
            "sealed" => Ok(TokenMode::Sealed),
            _ => Err(format!("Invalid token mode: {}", s)),
        }
    }
}
