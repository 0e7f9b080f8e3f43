use std::time::Duration;

const DEFAULT_SMARTAPI_BASE_URL: &str = "https://apiconnect.angelbroking.com";
const DEFAULT_SCRIP_MASTER_URL: &str =
    "https://margincalculator.angelbroking.com/OpenAPI_File/files/OpenAPIScripMaster.json";

/// All configuration loaded from environment variables at startup.
/// Malformed values cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // HTTP server
    pub port: u16,

    // Brokerage
    pub smartapi_base_url: String,
    pub scrip_master_url: String,
    /// Upper bound on every brokerage call, historic fetch included.
    pub fetch_timeout: Duration,

    // Candle history
    pub candle_interval: String,
    pub history_lookback_days: u64,

    // Strategy config file path; the standard rule set is used when unset.
    pub strategy_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 5000,
            smartapi_base_url: DEFAULT_SMARTAPI_BASE_URL.to_string(),
            scrip_master_url: DEFAULT_SCRIP_MASTER_URL.to_string(),
            fetch_timeout: Duration::from_secs(30),
            candle_interval: "FIVE_MINUTE".to_string(),
            history_lookback_days: 90,
            strategy_config_path: None,
        }
    }
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Every variable is optional.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        let defaults = Config::default();

        Config {
            port: parsed_env("PORT").unwrap_or(defaults.port),
            smartapi_base_url: optional_env("SMARTAPI_BASE_URL")
                .unwrap_or(defaults.smartapi_base_url),
            scrip_master_url: optional_env("SCRIP_MASTER_URL")
                .unwrap_or(defaults.scrip_master_url),
            fetch_timeout: parsed_env::<u64>("FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            candle_interval: optional_env("CANDLE_INTERVAL").unwrap_or(defaults.candle_interval),
            history_lookback_days: parsed_env("HISTORY_LOOKBACK_DAYS")
                .unwrap_or(defaults.history_lookback_days),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH"),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    optional_env(key).map(|v| {
        v.trim().parse().unwrap_or_else(|_| {
            panic!("Environment variable '{key}' has an invalid value: '{v}'")
        })
    })
}
