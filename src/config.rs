use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const DEFAULT_OPENWEATHER_API_KEY: &str = "replace-with-your-openweather-key";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub openweather_weather_path: String,
    pub weather_lang: String,
    pub default_city: String,
    pub default_country: String,
    pub update_interval: Duration,
    pub fetch_timeout: Duration,
    pub bind_addr: String,
    pub static_dir: String,
    pub template_path: String,
    /// Set on read-only deployments, where the static directory can't be created or served.
    pub read_only_deployment: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./weather_dashboard.db".to_string()),
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .unwrap_or_else(|_| DEFAULT_OPENWEATHER_API_KEY.to_string()),
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_weather_path: env::var("OPENWEATHER_WEATHER_PATH")
                .unwrap_or_else(|_| "/data/2.5/weather".to_string()),
            weather_lang: env::var("WEATHER_LANG").unwrap_or_else(|_| "id".to_string()),
            default_city: env::var("DEFAULT_CITY").unwrap_or_else(|_| "Pontianak".to_string()),
            default_country: env::var("DEFAULT_COUNTRY").unwrap_or_else(|_| "ID".to_string()),
            update_interval: Duration::from_secs(secs_from_env("UPDATE_INTERVAL_SECS", 10)?),
            fetch_timeout: Duration::from_secs(secs_from_env("FETCH_TIMEOUT_SECS", 5)?),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
            template_path: env::var("TEMPLATE_PATH")
                .unwrap_or_else(|_| "templates/index.html".to_string()),
            read_only_deployment: env::var_os("VERCEL").is_some(),
        })
    }
}

fn secs_from_env(key: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a whole number of seconds: {}", key, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        openweather_api_key: "test-key".to_string(),
        openweather_base_url: base_url.to_string(),
        openweather_weather_path: "/data/2.5/weather".to_string(),
        weather_lang: "id".to_string(),
        default_city: "Pontianak".to_string(),
        default_country: "ID".to_string(),
        update_interval: Duration::from_millis(20),
        fetch_timeout: Duration::from_millis(300),
        bind_addr: "127.0.0.1:0".to_string(),
        static_dir: "static".to_string(),
        template_path: "templates/index.html".to_string(),
        read_only_deployment: true,
    }
}
