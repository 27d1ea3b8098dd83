use chrono_tz::Tz;
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ConfigError;

pub const DEFAULT_CALENDAR_URL: &str = "https://libcal.jocolibrary.org/reserve/makerspace";
pub const DEFAULT_PAGE_CEILING: usize = 10;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3000;

/// Options that shape one availability scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub watch_list: Vec<String>,
    pub time_zone: Tz,
    pub page_ceiling: usize,
    pub settle_delay: Duration,
    pub calendar_url: String,
}

impl ScanConfig {
    pub fn new(watch_list: &[&str], time_zone: Tz) -> Self {
        Self {
            watch_list: watch_list.iter().map(|s| s.trim().to_string()).collect(),
            time_zone,
            page_ceiling: DEFAULT_PAGE_CEILING,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            calendar_url: DEFAULT_CALENDAR_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub endpoint: String,
    pub key_id: String,
    pub secret: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub access_token: String,
    pub api_endpoint: String,
    pub title_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Serve,
}

// Full process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub scan: ScanConfig,
    pub state_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub render_endpoint: String,
    pub notifier: Option<NotifierConfig>,
    pub calendar: Option<CalendarConfig>,
    pub run_mode: RunMode,
    pub bind_addr: String,
    pub trigger_auth_token: Option<String>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Split a `|`-separated watch list into trimmed, de-duplicated names.
pub fn parse_watch_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split('|').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

pub fn parse_time_zone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimeZone(name.to_string()))
}

impl Config {
    /// Load configuration from the environment (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_watch_list = optional("WATCH_LIST").ok_or(ConfigError::Missing("WATCH_LIST"))?;
        let watch_list = parse_watch_list(&raw_watch_list);
        if watch_list.is_empty() {
            return Err(ConfigError::Invalid {
                name: "WATCH_LIST",
                value: raw_watch_list,
            });
        }

        let time_zone =
            parse_time_zone(&optional("TIME_ZONE").unwrap_or_else(|| "America/Chicago".to_string()))?;

        let page_ceiling = parse_number("PAGE_CEILING", DEFAULT_PAGE_CEILING)?;
        if page_ceiling == 0 {
            return Err(ConfigError::Invalid {
                name: "PAGE_CEILING",
                value: "0".to_string(),
            });
        }
        let settle_delay_ms = parse_number("SETTLE_DELAY_MS", DEFAULT_SETTLE_DELAY_MS)?;

        let calendar_url =
            optional("CALENDAR_URL").unwrap_or_else(|| DEFAULT_CALENDAR_URL.to_string());

        let notifier = match optional("NOTIFY_ENDPOINT") {
            Some(endpoint) => Some(NotifierConfig {
                endpoint,
                key_id: optional("NOTIFY_KEY_ID").unwrap_or_default(),
                secret: optional("NOTIFY_SECRET").ok_or(ConfigError::Missing("NOTIFY_SECRET"))?,
                recipient: optional("NOTIFY_TO").ok_or(ConfigError::Missing("NOTIFY_TO"))?,
            }),
            None => {
                info!("NOTIFY_ENDPOINT not set - email notifications disabled");
                None
            }
        };

        let calendar = match (optional("GOOGLE_CALENDAR_ID"), optional("GOOGLE_ACCESS_TOKEN")) {
            (Some(calendar_id), Some(access_token)) => Some(CalendarConfig {
                calendar_id,
                access_token,
                api_endpoint: optional("GOOGLE_API_ENDPOINT")
                    .unwrap_or_else(|| "https://www.googleapis.com/calendar/v3".to_string()),
                title_prefix: optional("EVENT_TITLE_PREFIX")
                    .unwrap_or_else(|| "Makerspace".to_string()),
            }),
            (Some(_), None) => {
                warn!("GOOGLE_CALENDAR_ID set without GOOGLE_ACCESS_TOKEN - calendar sync disabled");
                None
            }
            _ => None,
        };

        let run_mode = match optional("RUN_MODE").as_deref() {
            None | Some("once") => RunMode::Once,
            Some("serve") => RunMode::Serve,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "RUN_MODE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            scan: ScanConfig {
                watch_list,
                time_zone,
                page_ceiling,
                settle_delay: Duration::from_millis(settle_delay_ms),
                calendar_url,
            },
            state_path: PathBuf::from(
                optional("STATE_PATH").unwrap_or_else(|| "previous-state.json".to_string()),
            ),
            summary_path: optional("SUMMARY_PATH").map(PathBuf::from),
            render_endpoint: optional("RENDER_ENDPOINT")
                .unwrap_or_else(|| "http://127.0.0.1:9222".to_string()),
            notifier,
            calendar,
            run_mode,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            trigger_auth_token: optional("TRIGGER_AUTH_TOKEN"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch_list() {
        let names = parse_watch_list(" Laser Cutter | Vinyl Cutter & Heat Press w/PC ||Laser Cutter");
        assert_eq!(names, vec!["Laser Cutter", "Vinyl Cutter & Heat Press w/PC"]);
    }

    #[test]
    fn test_parse_time_zone() {
        assert_eq!(parse_time_zone("America/Chicago").unwrap(), chrono_tz::America::Chicago);
        assert!(matches!(
            parse_time_zone("Mars/Olympus"),
            Err(ConfigError::UnknownTimeZone(_))
        ));
    }

    #[test]
    fn test_scan_config_defaults() {
        let config = ScanConfig::new(&["Laser Cutter "], chrono_tz::UTC);
        assert_eq!(config.watch_list, vec!["Laser Cutter"]);
        assert_eq!(config.page_ceiling, 10);
        assert_eq!(config.settle_delay, Duration::from_millis(3000));
    }
}
