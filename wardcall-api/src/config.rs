use std::str::FromStr;

use serde::Deserialize;
use serde_with::serde_as;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use strum::{Display, EnumString};
use time::UtcOffset;
use webpush::{VapidSigner, WebPushError};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub vapid: VapidSettings,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub app_url: String,
    /// Offset of the hospital's wall clocks from UTC, e.g. `"+02:00"`.
    /// Quiet hours windows are interpreted on this clock.
    #[serde(deserialize_with = "deserialize_utc_offset")]
    pub utc_offset: UtcOffset,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

/// VAPID key material. The keys usually arrive through the environment
/// (`WARDCALL_VAPID__PUBLIC_KEY` / `WARDCALL_VAPID__PRIVATE_KEY`) rather
/// than the yaml files.
#[derive(Deserialize, Clone)]
pub struct VapidSettings {
    pub subject: String,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
}

impl VapidSettings {
    /// `None` when no key material is configured; dispatch requests are then
    /// rejected per request instead of the service refusing to boot.
    pub fn signer(&self) -> Result<Option<VapidSigner>, WebPushError> {
        match (&self.private_key, &self.public_key) {
            (Some(private_key), Some(public_key)) => Ok(Some(VapidSigner::new(
                private_key,
                public_key,
                &self.subject,
            )?)),
            _ => Ok(None),
        }
    }
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let config_directory = base_path.join("config");

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .expect("Failed to parse APP_ENVIRONMENT");
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("WARDCALL")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}

fn deserialize_utc_offset<'de, D>(deserializer: D) -> Result<UtcOffset, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_utc_offset(&value).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid UTC offset {value:?}, expected +HH:MM or -HH:MM"
        ))
    })
}

fn parse_utc_offset(value: &str) -> Option<UtcOffset> {
    if value == "Z" {
        return Some(UtcOffset::UTC);
    }

    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+')?),
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i8 = hours.parse().ok()?;
    let minutes: i8 = minutes.parse().ok()?;

    let (hours, minutes) = if negative {
        (-hours, -minutes)
    } else {
        (hours, minutes)
    };
    UtcOffset::from_hms(hours, minutes, 0).ok()
}
