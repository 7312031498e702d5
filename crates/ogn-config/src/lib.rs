use serde::{Deserialize, Serialize};
use std::{env, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Local,
    Dev,
    Test,
    Prod,
}

impl Environment {
    pub fn from_env(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "test" | "testing" => Self::Test,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub environment: Environment,
    pub bind_addr: String,
    pub metrics_addr: Option<String>,
    pub log_level: String,
    pub templates_dir: String,
}

impl ServiceConfig {
    pub fn from_env(default_service_name: &str) -> Self {
        let service_name = env_var("OGN_SERVICE_NAME", default_service_name.to_string());
        let environment = Environment::from_env(&env_var("OGN_ENV", "local".to_string()));
        let bind_addr = env_var("OGN_BIND_ADDR", "0.0.0.0:8080".to_string());
        let metrics_addr = env::var("OGN_METRICS_ADDR").ok();
        let log_level = env_var("OGN_LOG_LEVEL", "info".to_string());
        let templates_dir = env_var(
            "OGN_TEMPLATES_DIR",
            format!("services/{default_service_name}/templates"),
        );

        Self {
            service_name,
            environment,
            bind_addr,
            metrics_addr,
            log_level,
            templates_dir,
        }
    }
}

pub fn env_var(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

pub fn env_var_u8(key: &str, default: u8) -> u8 {
    parse_env(key).unwrap_or(default)
}

pub fn env_var_u32(key: &str, default: u32) -> u32 {
    parse_env(key).unwrap_or(default)
}

pub fn env_var_i32(key: &str, default: i32) -> i32 {
    parse_env(key).unwrap_or(default)
}

pub fn env_var_u64(key: &str, default: u64) -> u64 {
    parse_env(key).unwrap_or(default)
}

pub fn env_var_f64(key: &str, default: f64) -> f64 {
    parse_env(key).unwrap_or(default)
}

pub fn env_var_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| parse_bool(&value).unwrap_or(default))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
