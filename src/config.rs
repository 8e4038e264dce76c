use std::env;

use uuid::Uuid;

use crate::error::{Error, Result};

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_API_PREFIX: &str = "api";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// AppConfig
///
/// Holds the host's configuration. Immutable once loaded and cloned into the auth
/// middleware and the serve loop, so every request observes the same values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local identity bypass and log format.
    pub env: Env,
    // Secret used to validate incoming HS256 bearer tokens.
    pub jwt_secret: String,
    // Base path every module route is mounted under (e.g. "api").
    pub api_prefix: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Ids the local identity bypass resolves to the admin role. Everyone else is a user.
    pub local_admin_ids: Vec<Uuid>,
}

/// Env
///
/// Runtime context: local development utilities versus hardened production behavior.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// A non-failing configuration for tests and embedded use, no environment access.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            local_admin_ids: Vec::new(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables and fails fast when a value
    /// required by the current environment is missing.
    ///
    /// # Errors
    /// Returns `Error::Config` when `JWT_SECRET` is absent in production or
    /// `LOCAL_ADMIN_IDS` holds something that is not a UUID.
    pub fn load() -> Result<Self> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        // The production secret must be set explicitly, local falls back to a known value.
        let jwt_secret = match (env, env::var("JWT_SECRET")) {
            (_, Ok(secret)) => secret,
            (Env::Production, Err(_)) => {
                return Err(Error::Config(
                    "JWT_SECRET must be set in production".to_string(),
                ));
            }
            (Env::Local, Err(_)) => LOCAL_JWT_SECRET.to_string(),
        };

        let local_admin_ids = match env::var("LOCAL_ADMIN_IDS") {
            Ok(ids) => parse_ids(&ids)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            env,
            jwt_secret,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| DEFAULT_API_PREFIX.to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            local_admin_ids,
        })
    }
}

/// Comma-separated UUIDs, blanks ignored.
fn parse_ids(raw: &str) -> Result<Vec<Uuid>> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            Uuid::parse_str(id)
                .map_err(|e| Error::Config(format!("LOCAL_ADMIN_IDS entry `{id}`: {e}")))
        })
        .collect()
}
