//! Scheduled maintenance windows
//!
//! Windows come from a Google Calendar when an API key is configured, then
//! from a public ICS feed, and otherwise the site reports none. Feed
//! problems never fail an API request; they degrade to the empty shape.

mod calendar;
mod ics;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::config::CalendarConfig;

/// One scheduled maintenance window, in UTC
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceWindow {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// All-day events localize midnight in the site timezone
    #[serde(rename = "allDay")]
    pub all_day: bool,
}

impl MaintenanceWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// Maintenance feed as served by the API
#[derive(Debug, Clone, Serialize)]
pub struct Maintenance {
    /// True while some window is in progress
    pub active: bool,
    pub windows: Vec<MaintenanceWindow>,
    pub source: FeedSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Calendar,
    Ics,
    None,
}

impl Maintenance {
    pub fn none() -> Self {
        Self {
            active: false,
            windows: Vec::new(),
            source: FeedSource::None,
        }
    }
}

/// Fetch upcoming maintenance windows. Infallible by design: any feed
/// failure is logged and reported as no windows.
pub async fn fetch(config: &CalendarConfig, tz: Tz) -> Maintenance {
    let now = Utc::now();
    match fetch_windows(config, tz, now).await {
        Ok((windows, source)) => Maintenance {
            active: windows.iter().any(|w| w.contains(now)),
            windows,
            source,
        },
        Err(e) => {
            tracing::warn!("Maintenance feed unavailable: {:#}", e);
            Maintenance::none()
        }
    }
}

async fn fetch_windows(
    config: &CalendarConfig,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<(Vec<MaintenanceWindow>, FeedSource)> {
    if let Some(calendar_id) = &config.calendar_id {
        if let Ok(api_key) = std::env::var(&config.api_key_env) {
            match calendar::fetch_events(calendar_id, &api_key, tz, now, config.lookahead_days).await
            {
                Ok(events) => {
                    return Ok((select_windows(events, config, now), FeedSource::Calendar));
                }
                Err(e) => {
                    tracing::warn!("Calendar API failed, trying ICS fallback: {:#}", e);
                }
            }
        } else {
            tracing::debug!(
                "Calendar id set but {} is not in the environment",
                config.api_key_env
            );
        }
    }

    if let Some(url) = &config.ics_url {
        let events = ics::fetch_events(url, tz).await?;
        return Ok((select_windows(events, config, now), FeedSource::Ics));
    }

    Ok((Vec::new(), FeedSource::None))
}

/// Keep matching, still-relevant windows: summary contains the keyword,
/// the window has not ended, and it starts inside the lookahead horizon.
/// Sorted by start and capped at `max_windows`.
fn select_windows(
    mut events: Vec<MaintenanceWindow>,
    config: &CalendarConfig,
    now: DateTime<Utc>,
) -> Vec<MaintenanceWindow> {
    let horizon = now + Duration::days(config.lookahead_days);
    let keyword = config.keyword.to_lowercase();

    events.retain(|w| {
        (keyword.is_empty() || w.summary.to_lowercase().contains(&keyword))
            && w.end > now
            && w.start < horizon
    });
    events.sort_by_key(|w| w.start);
    events.truncate(config.max_windows);
    events
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;
    Ok(client)
}
