use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
use cors::{split_origins, DEFAULT_KIOSK_ORIGIN};
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/checkin";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60 * 24;

/// Which failed scan attempts leave a trace in the scan log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Record a failed event with no ticket when the code matches nothing.
    pub log_unknown_codes: bool,
    /// Record a failed event against the ticket when its limit is reached.
    pub log_rejected_scans: bool,
}

/// Credentials of a staff account created at startup if missing.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub session_ttl: Duration,
    pub scan_policy: ScanPolicy,
    pub admin_seed: Option<AdminSeed>,
    /// Origins the kiosk and staff pages are served from.
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Invalid values fall back
    /// to their default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin_seed = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed {
                    name: lookup("ADMIN_NAME").unwrap_or_else(|| "Admin".to_string()),
                    email,
                    password,
                })
            }
            _ => None,
        };

        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            session_ttl: Duration::from_secs(parse_or(
                &lookup,
                "SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )),
            scan_policy: ScanPolicy {
                log_unknown_codes: parse_or(&lookup, "LOG_UNKNOWN_CODES", false),
                log_rejected_scans: parse_or(&lookup, "LOG_REJECTED_SCANS", false),
            },
            admin_seed,
            allowed_origins: split_origins(
                &lookup("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_KIOSK_ORIGIN.to_string()),
            ),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
            default
        }),
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
