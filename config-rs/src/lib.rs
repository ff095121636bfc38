//! config-rs/lib.rs
//! Configuration for the sentiment service, resolved once at startup.
//! Values come from the process environment (optionally seeded from `.env`).

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

mod service;

pub use service::{
    ConfigError, InsightThresholds, LlmConfig, LogConfig, ModelConfig, ProviderConfig, ServiceConfig,
    DEFAULT_PORT, MAX_LLM_TIMEOUT_SECS, SERVICE_ENV_PREFIX,
};

/// Loads `.env` (if present) and resolves the service configuration
pub fn load() -> Result<ServiceConfig, ConfigError> {
    dotenv::dotenv().ok();
    ServiceConfig::from_env()
}

/// Environment lookup used by `ServiceConfig::from_env`
pub(crate) fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Parses `key` through `lookup`, falling back to `default` with a warning
/// when the value is missing or malformed
pub(crate) fn parse_or<T, L>(lookup: &L, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    L: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value '{}' in {}, using default {}", raw, key, default);
            default
        }),
        None => default,
    }
}

/// Parses a boolean flag ("1", "true", "yes", "on" are truthy)
pub(crate) fn flag_or<L>(lookup: &L, key: &str, default: bool) -> bool
where
    L: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "SENTIMENT")
/// * `default_port` - The default port to use if not specified in environment
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    service_port_from(&env_lookup, service_name, default_port)
}

/// Create a SocketAddr for binding a service
///
/// `<NAME>_SERVICE_ADDR` may hold `host:port` or `http://host:port`; otherwise
/// the service binds all interfaces on `<NAME>_SERVICE_PORT`.
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    bind_address_from(&env_lookup, service_name, default_port)
}

/// Get client connection address for connecting to a service
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "SENTIMENT")
/// * `default_port` - The default port to use if not specified in environment
/// * `host` - Optional host to use if not specified in environment (default: "localhost")
pub fn get_client_address(service_name: &str, default_port: u16, host: Option<&str>) -> String {
    let addr_var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());
    if let Ok(addr) = env::var(&addr_var_name) {
        if addr.starts_with("http://") || addr.starts_with("https://") {
            return addr;
        }
        return format!("http://{}", addr);
    }

    let port = get_service_port(service_name, default_port);
    format!("http://{}:{}", host.unwrap_or("localhost"), port)
}

pub(crate) fn service_port_from<L>(lookup: &L, service_name: &str, default_port: u16) -> u16
where
    L: Fn(&str) -> Option<String>,
{
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    parse_or(lookup, &var_name, default_port)
}

pub(crate) fn bind_address_from<L>(lookup: &L, service_name: &str, default_port: u16) -> SocketAddr
where
    L: Fn(&str) -> Option<String>,
{
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Some(addr_str) = lookup(&var_name) {
        let stripped = addr_str
            .strip_prefix("http://")
            .or_else(|| addr_str.strip_prefix("https://"))
            .unwrap_or(&addr_str);
        match stripped.parse::<SocketAddr>() {
            Ok(addr) => return addr,
            Err(_) => log::warn!("Invalid address format in {}, using default", var_name),
        }
    }

    let port = service_port_from(lookup, service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_get_service_port() {
        std::env::set_var("CFGTEST_SERVICE_PORT", "9000");
        assert_eq!(get_service_port("CFGTEST", 8000), 9000);

        std::env::remove_var("CFGUNKNOWN_SERVICE_PORT");
        assert_eq!(get_service_port("CFGUNKNOWN", 8000), 8000);
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let lookup = lookup_from(&[("SENTIMENT_SERVICE_PORT", "not-a-port")]);
        assert_eq!(service_port_from(&lookup, "sentiment", 8000), 8000);
    }

    #[test]
    fn test_bind_address_variants() {
        let lookup = lookup_from(&[("SENTIMENT_SERVICE_ADDR", "http://127.0.0.1:9100")]);
        assert_eq!(
            bind_address_from(&lookup, "SENTIMENT", 8000),
            "127.0.0.1:9100".parse::<SocketAddr>().unwrap()
        );

        let lookup = lookup_from(&[("SENTIMENT_SERVICE_PORT", "8123")]);
        assert_eq!(
            bind_address_from(&lookup, "SENTIMENT", 8000),
            "0.0.0.0:8123".parse::<SocketAddr>().unwrap()
        );

        let lookup = lookup_from(&[("SENTIMENT_SERVICE_ADDR", "garbage")]);
        assert_eq!(
            bind_address_from(&lookup, "SENTIMENT", 8000),
            "0.0.0.0:8000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_get_client_address() {
        std::env::set_var("CFGCLIENT_SERVICE_ADDR", "example.com:9000");
        assert_eq!(get_client_address("CFGCLIENT", 8000, None), "http://example.com:9000");
        std::env::remove_var("CFGCLIENT_SERVICE_ADDR");

        assert_eq!(get_client_address("CFGNONE", 8000, None), "http://localhost:8000");
        assert_eq!(
            get_client_address("CFGNONE", 8000, Some("service.local")),
            "http://service.local:8000"
        );
    }

    #[test]
    fn test_flag_parsing() {
        let lookup = lookup_from(&[("A", "yes"), ("B", "0"), ("C", "ON")]);
        assert!(flag_or(&lookup, "A", false));
        assert!(!flag_or(&lookup, "B", true));
        assert!(flag_or(&lookup, "C", false));
        assert!(flag_or(&lookup, "MISSING", true));
    }
}
