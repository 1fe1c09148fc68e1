use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::placement::ExpiryBoostScorer;
use crate::waste::WastePolicy;

/// Complete application configuration, loaded from environment variables
/// or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment
    /// variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("STOW_IT_RIGHT_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse STOW_IT_RIGHT_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    Self::DEFAULT_HOST
                        .parse::<IpAddr>()
                        .expect("Default host must be valid"),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("STOW_IT_RIGHT_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ STOW_IT_RIGHT_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse STOW_IT_RIGHT_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Tunables for the stowage engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    expiry_boost_days: i64,
    expiry_boost: u32,
    waste_policy: WastePolicy,
    expiring_lookahead_days: i64,
}

impl EngineConfig {
    const BOOST_DAYS_VAR: &'static str = "STOW_IT_RIGHT_EXPIRY_BOOST_DAYS";
    const BOOST_VAR: &'static str = "STOW_IT_RIGHT_EXPIRY_BOOST";
    const WASTE_POLICY_VAR: &'static str = "STOW_IT_RIGHT_WASTE_POLICY";
    const LOOKAHEAD_VAR: &'static str = "STOW_IT_RIGHT_EXPIRING_LOOKAHEAD_DAYS";

    pub const DEFAULT_EXPIRY_BOOST_DAYS: i64 = 7;
    pub const DEFAULT_EXPIRY_BOOST: u32 = 20;
    pub const DEFAULT_EXPIRING_LOOKAHEAD_DAYS: i64 = 7;

    fn from_env() -> Self {
        let expiry_boost_days = load_i64_with_warning(
            Self::BOOST_DAYS_VAR,
            Self::DEFAULT_EXPIRY_BOOST_DAYS,
            |value| value >= 0,
            "must not be negative",
        );
        let expiry_boost = load_u32_with_warning(Self::BOOST_VAR, Self::DEFAULT_EXPIRY_BOOST);
        let waste_policy = env_string(Self::WASTE_POLICY_VAR)
            .and_then(|raw| parse_waste_policy(&raw, Self::WASTE_POLICY_VAR))
            .unwrap_or_default();
        let expiring_lookahead_days = load_i64_with_warning(
            Self::LOOKAHEAD_VAR,
            Self::DEFAULT_EXPIRING_LOOKAHEAD_DAYS,
            |value| value > 0,
            "must be greater than 0",
        );

        Self {
            expiry_boost_days,
            expiry_boost,
            waste_policy,
            expiring_lookahead_days,
        }
    }

    /// The configured effective-priority scorer.
    pub fn scorer(&self) -> ExpiryBoostScorer {
        ExpiryBoostScorer {
            window_days: self.expiry_boost_days,
            boost: self.expiry_boost,
        }
    }

    pub fn waste_policy(&self) -> WastePolicy {
        self.waste_policy
    }

    pub fn expiring_lookahead_days(&self) -> i64 {
        self.expiring_lookahead_days
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_waste_policy(raw: &str, var_name: &str) -> Option<WastePolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "count" | "maxcount" | "max_count" => Some(WastePolicy::MaxCount),
        "value" | "maxvalue" | "max_value" => Some(WastePolicy::MaxValue),
        other => {
            eprintln!(
                "⚠️ Could not interpret {} ('{}') as waste policy (count|value). Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_i64_with_warning(
    var_name: &str,
    default: i64,
    validator: impl Fn(i64) -> bool,
    invalid_hint: &str,
) -> i64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) if validator(value) => value,
            Ok(_) => {
                eprintln!(
                    "⚠️ {} contains invalid value '{}': {}. Using {}.",
                    var_name, raw, invalid_hint, default
                );
                default
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

fn load_u32_with_warning(var_name: &str, default: u32) -> u32 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<u32>() {
            Ok(value) => value,
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waste_policy_parses_count_variants() {
        assert_eq!(parse_waste_policy("count", "V"), Some(WastePolicy::MaxCount));
        assert_eq!(parse_waste_policy("MaxCount", "V"), Some(WastePolicy::MaxCount));
        assert_eq!(parse_waste_policy(" max_count ", "V"), Some(WastePolicy::MaxCount));
    }

    #[test]
    fn waste_policy_parses_value_variants() {
        assert_eq!(parse_waste_policy("value", "V"), Some(WastePolicy::MaxValue));
        assert_eq!(parse_waste_policy("MAX_VALUE", "V"), Some(WastePolicy::MaxValue));
    }

    #[test]
    fn waste_policy_rejects_garbage() {
        assert_eq!(parse_waste_policy("knapsack", "V"), None);
        assert_eq!(parse_waste_policy("", "V"), None);
    }
}
