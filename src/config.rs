use crate::calendar::CalendarView;
use crate::error::{config_error, env_error, AppResult};
use chrono::Weekday;
use chrono_tz::Tz;
use dotenvy::dotenv;
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Default Gemini model used for slot suggestions
/// Admin password used when ADMIN_PASSWORD is unset
pub const DEFAULT_ADMIN_PASSWORD: &str = "password";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Location of the optional calendar display settings file
pub const CALENDAR_SETTINGS_PATH: &str = "config/calendar.toml";

/// Calendar display settings, optionally overridden by `config/calendar.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// View shown when the calendar page opens
    pub default_view: CalendarView,
    /// First day of the week in week and month views
    #[serde(with = "weekday_name")]
    pub week_starts_on: Weekday,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            default_view: CalendarView::Month,
            week_starts_on: Weekday::Mon,
        }
    }
}

impl CalendarSettings {
    /// Load settings from a TOML file, falling back to defaults when the file is absent
    pub fn load_from(path: impl AsRef<Path>) -> AppResult<Self> {
        match fs::read_to_string(path.as_ref()) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(_) => Ok(Self::default()),
        }
    }
}

mod weekday_name {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&day.to_string().to_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Weekday>()
            .map_err(|_| serde::de::Error::custom(format!("unknown weekday: {}", raw)))
    }
}

/// Main configuration structure for the service
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind the HTTP server to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// JWT secret for signing/verifying tokens
    pub jwt_secret: String,
    /// Token expiration time in minutes
    pub token_expiration_minutes: i64,
    /// Admin username
    pub admin_username: String,
    /// Admin password
    pub admin_password: String,
    /// Additional `(username, password)` pairs allowed to sign in
    pub extra_users: Vec<(String, String)>,
    /// Redis URL for event storage, in-memory storage is used when unset
    pub redis_url: Option<String>,
    /// Gemini API key, suggestions are disabled when unset
    pub gemini_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Sampling temperature for suggestion requests
    pub suggestion_temperature: f64,
    /// Timezone used to lay out calendar views
    pub timezone: Tz,
    /// Locale for user-facing messages
    pub locale: String,
    /// Directory of static assets
    pub assets_dir: String,
    /// Calendar display settings
    pub calendar: CalendarSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: "test_secret".to_string(),
            token_expiration_minutes: 60 * 24,
            admin_username: "admin".to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            extra_users: Vec::new(),
            redis_url: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            suggestion_temperature: 0.2,
            timezone: Tz::UTC,
            locale: "en".to_string(),
            assets_dir: "assets".to_string(),
            calendar: CalendarSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let defaults = Config::default();

        let host = env::var("HOST").unwrap_or(defaults.host);

        let port = match env::var("PORT") {
            Ok(value) => value.parse::<u16>().map_err(|_| env_error("PORT"))?,
            Err(_) => defaults.port,
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, generating a random secret; sessions will not survive restarts");
                random_secret()
            }
        };

        let token_expiration_minutes = match env::var("TOKEN_EXPIRATION_MINUTES") {
            Ok(value) => value
                .parse::<i64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .ok_or_else(|| env_error("TOKEN_EXPIRATION_MINUTES"))?,
            Err(_) => defaults.token_expiration_minutes,
        };

        let admin_username = env::var("ADMIN_USERNAME").unwrap_or(defaults.admin_username);
        let admin_password = env::var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password);

        let extra_users = match env::var("EXTRA_USERS") {
            Ok(value) => parse_user_list(&value)?,
            Err(_) => Vec::new(),
        };

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.is_empty());
        let gemini_api_key = env::var("GEMINI_API_KEY").ok().filter(|key| !key.is_empty());
        let gemini_model = env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model);

        let suggestion_temperature = match env::var("SUGGESTION_TEMPERATURE") {
            Ok(value) => value
                .parse::<f64>()
                .ok()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or_else(|| env_error("SUGGESTION_TEMPERATURE"))?,
            Err(_) => defaults.suggestion_temperature,
        };

        let timezone = match env::var("TIMEZONE") {
            Ok(name) => parse_timezone(&name)?,
            Err(_) => defaults.timezone,
        };

        let locale = env::var("APP_LOCALE").unwrap_or(defaults.locale);
        let assets_dir = env::var("ASSETS_DIR").unwrap_or(defaults.assets_dir);
        let calendar = CalendarSettings::load_from(CALENDAR_SETTINGS_PATH)?;

        let config = Config {
            host,
            port,
            jwt_secret,
            token_expiration_minutes,
            admin_username,
            admin_password,
            extra_users,
            redis_url,
            gemini_api_key,
            gemini_model,
            suggestion_temperature,
            timezone,
            locale,
            assets_dir,
            calendar,
        };

        if config.uses_default_admin_password() {
            warn!(
                "ADMIN_PASSWORD not set, user {} signs in with the default password",
                config.admin_username
            );
        }

        Ok(config)
    }

    /// Whether the admin account still has the built-in password
    pub fn uses_default_admin_password(&self) -> bool {
        self.admin_password == DEFAULT_ADMIN_PASSWORD
    }
}

/// Parse a timezone name like `Europe/Helsinki`
pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| config_error(&format!("Unknown timezone: {}", name)))
}

/// Parse `name:password` pairs separated by commas
pub fn parse_user_list(value: &str) -> AppResult<Vec<(String, String)>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((name, password)) if !name.trim().is_empty() && !password.is_empty() => {
                Ok((name.trim().to_string(), password.to_string()))
            }
            _ => Err(config_error(&format!("Invalid user entry: {}", entry))),
        })
        .collect()
}

fn random_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_default_admin_password() {
        assert!(Config::default().uses_default_admin_password());
        let config = Config {
            admin_password: "s3cret-enough".to_string(),
            ..Config::default()
        };
        assert!(!config.uses_default_admin_password());
    }

    #[test]
    fn parses_user_list() {
        let users = parse_user_list("alice:secret, bob:hunter2").unwrap();
        assert_eq!(
            users,
            vec![
                ("alice".to_string(), "secret".to_string()),
                ("bob".to_string(), "hunter2".to_string())
            ]
        );
    }

    #[test]
    fn rejects_user_without_password() {
        assert!(parse_user_list("alice").is_err());
        assert!(parse_user_list("alice:").is_err());
    }

    #[test]
    fn parses_known_timezone() {
        assert_eq!(parse_timezone("Europe/Helsinki").unwrap(), chrono_tz::Europe::Helsinki);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn calendar_settings_from_toml() {
        let settings: CalendarSettings =
            toml::from_str("default_view = \"week\"\nweek_starts_on = \"sunday\"").unwrap();
        assert_eq!(settings.default_view, CalendarView::Week);
        assert_eq!(settings.week_starts_on, Weekday::Sun);
    }

    #[test]
    fn calendar_settings_default_when_missing() {
        let settings = CalendarSettings::load_from("does/not/exist.toml").unwrap();
        assert_eq!(settings.default_view, CalendarView::Month);
        assert_eq!(settings.week_starts_on, Weekday::Mon);
    }
}
