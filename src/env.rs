//! Environment variable names used to configure the adapters from a
//! service's environment.
//!
//! These are purely helpers; the adapter types themselves never read the
//! environment.

use crate::core_handler::CoreHandlerOptions;
use crate::error::ConfigError;
use crate::handler_core::HandlerCoreOptions;

/// Key under which the logger name travels as an attribute, e.g. `logger`.
/// Unset or empty disables logger-name mapping.
pub const LOGBRIDGE_STREAM_NAME_KEY_ENV: &str = "LOGBRIDGE_STREAM_NAME_KEY";

/// Whether record source locations become entry callers (`true`/`false`,
/// `1`/`0`, `yes`/`no`).
pub const LOGBRIDGE_ADD_SOURCE_ENV: &str = "LOGBRIDGE_ADD_SOURCE";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(ConfigError::InvalidBool { var, value: value.to_string() }),
    }
}

fn stream_name_key(raw: String) -> Option<String> {
    let key = raw.trim();
    (!key.is_empty()).then(|| key.to_string())
}

impl HandlerCoreOptions {
    /// Options read from `LOGBRIDGE_STREAM_NAME_KEY`.
    pub fn from_env() -> Self {
        HandlerCoreOptions {
            stream_name_key: stream_name_key(env_or(LOGBRIDGE_STREAM_NAME_KEY_ENV, "")),
        }
    }
}

impl CoreHandlerOptions {
    /// Options read from `LOGBRIDGE_STREAM_NAME_KEY` and
    /// `LOGBRIDGE_ADD_SOURCE`. No attribute rewrite hook is installed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = env_or(LOGBRIDGE_ADD_SOURCE_ENV, "");
        let add_source = parse_bool(LOGBRIDGE_ADD_SOURCE_ENV, &raw)?;
        Ok(CoreHandlerOptions {
            add_source,
            replace_attr: None,
            stream_name_key: stream_name_key(env_or(LOGBRIDGE_STREAM_NAME_KEY_ENV, "")),
        })
    }
}
