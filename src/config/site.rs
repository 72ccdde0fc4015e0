//! Site configuration (craftpress.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub url: String,
    pub language: String,
    /// IANA timezone name, used when localizing all-day calendar dates
    pub timezone: String,

    // Directory
    pub content_dir: String,
    pub public_dir: String,

    // API server
    #[serde(default)]
    pub server: ServerConfig,

    // Game server queried for live status
    #[serde(default)]
    pub game: GameConfig,

    // Maintenance calendar feed
    #[serde(default)]
    pub calendar: CalendarConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Minecraft Community".to_string(),
            description: String::new(),
            url: "http://localhost:4000".to_string(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),

            content_dir: "content".to_string(),
            public_dir: "public".to_string(),

            server: ServerConfig::default(),
            game: GameConfig::default(),
            calendar: CalendarConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the configured timezone, falling back to UTC when it is
    /// not a known IANA name.
    pub fn tz(&self) -> chrono_tz::Tz {
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                if !self.timezone.is_empty() {
                    tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
                }
                chrono_tz::Tz::UTC
            }
        }
    }
}

/// API server bind settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
        }
    }
}

/// Minecraft server queried over Server List Ping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 25565,
            timeout_ms: 3000,
        }
    }
}

/// Maintenance calendar sources.
///
/// The Google Calendar API key is read from the environment variable named
/// by `api_key_env`, never from the config file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub calendar_id: Option<String>,
    pub api_key_env: String,
    pub ics_url: Option<String>,
    /// Case-insensitive summary filter; empty keeps every event
    pub keyword: String,
    pub lookahead_days: i64,
    pub max_windows: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: None,
            api_key_env: "GOOGLE_CALENDAR_API_KEY".to_string(),
            ics_url: None,
            keyword: "maintenance".to_string(),
            lookahead_days: 14,
            max_windows: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.content_dir, "content");
        assert_eq!(config.public_dir, "public");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.game.port, 25565);
        assert_eq!(config.game.timeout_ms, 3000);
        assert_eq!(config.calendar.keyword, "maintenance");
        assert_eq!(config.calendar.max_windows, 5);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: Stonefell SMP
timezone: Europe/Berlin
server:
  port: 8080
game:
  host: play.stonefell.net
  timeout_ms: 1500
calendar:
  ics_url: https://example.com/maintenance.ics
  lookahead_days: 7
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "Stonefell SMP");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.game.host, "play.stonefell.net");
        assert_eq!(config.game.timeout_ms, 1500);
        assert_eq!(config.game.port, 25565);
        assert_eq!(
            config.calendar.ics_url.as_deref(),
            Some("https://example.com/maintenance.ics")
        );
        assert_eq!(config.calendar.lookahead_days, 7);
        assert_eq!(config.tz(), chrono_tz::Tz::Europe__Berlin);
    }

    #[test]
    fn test_unknown_keys_land_in_extra() {
        let yaml = "title: x\nnav_links:\n  - home\n  - rules\n";
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.extra.contains_key("nav_links"));
    }

    #[test]
    fn test_bad_timezone_falls_back_to_utc() {
        let config = SiteConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert_eq!(config.tz(), chrono_tz::Tz::UTC);
    }
}
