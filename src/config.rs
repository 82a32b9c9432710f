//! Runtime settings loaded from the environment (and `.env`, if present).

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::Exchange;
use crate::error::AppError;

pub const DEFAULT_OUTPUT_DIR: &str = "data/prices";
pub const DEFAULT_TWSE_URL: &str = "https://www.twse.com.tw/exchangeReport/BWIBBU_d";
pub const DEFAULT_TPEX_URL: &str = "https://www.tpex.org.tw/web/bond/tradeinfo/bond_close_ajax.php";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COOLDOWN_SECS: u64 = 3;

#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub twse_url: String,
    pub tpex_url: String,
    pub user_agent: String,
    pub fetch_timeout: Duration,
    /// Pause between consecutive exchange requests. Rapid polling gets the
    /// client blocked, so this is never skipped in production runs.
    pub cooldown: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            twse_url: DEFAULT_TWSE_URL.to_string(),
            tpex_url: DEFAULT_TPEX_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Self::default();

        if let Some(dir) = non_empty(lookup("CB_PRICES_DIR")) {
            settings.output_dir = PathBuf::from(dir);
        }
        if let Some(url) = non_empty(lookup("CB_TWSE_URL")) {
            settings.twse_url = url;
        }
        if let Some(url) = non_empty(lookup("CB_TPEX_URL")) {
            settings.tpex_url = url;
        }
        if let Some(ua) = non_empty(lookup("CB_USER_AGENT")) {
            settings.user_agent = ua;
        }
        if let Some(raw) = non_empty(lookup("CB_FETCH_TIMEOUT_SECS")) {
            let secs = parse_secs("CB_FETCH_TIMEOUT_SECS", &raw)?;
            if secs == 0 {
                return Err(AppError::config("CB_FETCH_TIMEOUT_SECS must be greater than 0."));
            }
            settings.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = non_empty(lookup("CB_COOLDOWN_SECS")) {
            let secs = parse_secs("CB_COOLDOWN_SECS", &raw)?;
            if secs == 0 {
                return Err(AppError::config("CB_COOLDOWN_SECS must be greater than 0."));
            }
            settings.cooldown = Duration::from_secs(secs);
        }

        Ok(settings)
    }

    pub fn endpoint(&self, exchange: Exchange) -> &str {
        match exchange {
            Exchange::Twse => &self.twse_url,
            Exchange::Tpex => &self.tpex_url,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, AppError> {
    raw.parse::<u64>()
        .map_err(|_| AppError::config(format!("{key} must be a whole number of seconds, got '{raw}'.")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::EXIT_CONFIG;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("data/prices"));
        assert_eq!(settings.fetch_timeout, Duration::from_secs(30));
        assert_eq!(settings.cooldown, Duration::from_secs(3));
        assert_eq!(settings.endpoint(Exchange::Twse), DEFAULT_TWSE_URL);
        assert_eq!(settings.endpoint(Exchange::Tpex), DEFAULT_TPEX_URL);
    }

    #[test]
    fn overrides_are_applied() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("CB_PRICES_DIR", "/srv/cb"),
            ("CB_COOLDOWN_SECS", "5"),
            ("CB_TPEX_URL", "http://localhost:8080/tpex"),
            ("CB_TWSE_URL", "   "),
        ]))
        .unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/srv/cb"));
        assert_eq!(settings.cooldown, Duration::from_secs(5));
        assert_eq!(settings.endpoint(Exchange::Tpex), "http://localhost:8080/tpex");
        assert_eq!(settings.endpoint(Exchange::Twse), DEFAULT_TWSE_URL);
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = Settings::from_lookup(lookup_from(&[("CB_COOLDOWN_SECS", "three")])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);

        let err = Settings::from_lookup(lookup_from(&[("CB_FETCH_TIMEOUT_SECS", "0")])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }

    #[test]
    fn cooldown_cannot_be_disabled() {
        let err = Settings::from_lookup(lookup_from(&[("CB_COOLDOWN_SECS", "0")])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
        assert!(err.to_string().contains("CB_COOLDOWN_SECS"));
    }
}
