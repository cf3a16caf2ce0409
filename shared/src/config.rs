//! Settings loaded from a YAML file, mirroring the shape of the original
//! service's `config_schema.Settings` (rooms, access list, accounts, ttl
//! knobs, Exchange credentials).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Wraps a secret so it never prints through `{:?}`.
#[derive(Clone, Deserialize)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    pub id: String,
    pub title: String,
    pub short_name: String,
    pub resource_email: String,
    pub my_uni_id: Option<String>,
    pub capacity: Option<u32>,
    /// `yellow`, `red`, `special`, or absent for an unrestricted room.
    pub access_level: Option<String>,
    #[serde(default)]
    pub restrict_daytime: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessGrant {
    pub user_email: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Accounts {
    #[serde(default)]
    pub staff: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MyUni {
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub ews_endpoint: String,
    pub username: String,
    pub password: Secret,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub app_root_path: String,
    pub api_key: Secret,
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,
    /// Per-room-id list of users granted access beyond their default role.
    #[serde(default)]
    pub access_list: HashMap<String, Vec<AccessGrant>>,
    #[serde(default = "default_ttl_calendar")]
    pub ttl_bookings_from_account_calendar: u64,
    #[serde(default = "default_ttl_busy")]
    pub ttl_bookings_from_busy_info: u64,
    #[serde(default = "default_recent_ttl")]
    pub recently_canceled_booking_ttl_sec: u64,
    #[serde(default = "default_cors")]
    pub cors_allow_origin_regex: String,
    #[serde(default)]
    pub accounts: Accounts,
    #[serde(default)]
    pub my_uni: MyUni,
    pub exchange: ExchangeConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_ttl_calendar() -> u64 {
    60
}

fn default_ttl_busy() -> u64 {
    60
}

fn default_recent_ttl() -> u64 {
    300
}

fn default_cors() -> String {
    ".*".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
}

impl Settings {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let built = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;
        Ok(built.try_deserialize()?)
    }

    pub fn room_by_id(&self, id: &str) -> Option<&RoomConfig> {
        self.rooms.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_never_leaks_value() {
        let s = Secret("super-secret".to_string());
        assert_eq!(format!("{s:?}"), "Secret(***)");
    }

    #[test]
    fn secret_expose_returns_raw_value() {
        let s = Secret("super-secret".to_string());
        assert_eq!(s.expose(), "super-secret");
    }
}
