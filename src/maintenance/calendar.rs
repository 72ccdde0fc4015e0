//! Google Calendar events feed

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use super::{http_client, MaintenanceWindow};

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars";

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

#[derive(Debug, Deserialize)]
struct CalendarEvent {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    start: Option<EventTime>,
    #[serde(default)]
    end: Option<EventTime>,
}

/// Either `date` (all-day) or `dateTime` is set
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    date_time: Option<String>,
}

/// Query the events list endpoint for the configured window. Asks for
/// expanded recurring events in start order, which matches how the
/// windows are served.
pub(super) async fn fetch_events(
    calendar_id: &str,
    api_key: &str,
    tz: Tz,
    now: DateTime<Utc>,
    lookahead_days: i64,
) -> Result<Vec<MaintenanceWindow>> {
    let url = format!("{}/{}/events", EVENTS_URL, calendar_id);
    let time_min = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let time_max = (now + chrono::Duration::days(lookahead_days))
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let response = http_client()?
        .get(&url)
        .query(&[
            ("key", api_key),
            ("timeMin", time_min.as_str()),
            ("timeMax", time_max.as_str()),
            ("singleEvents", "true"),
            ("orderBy", "startTime"),
            ("maxResults", "50"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("calendar API returned {}", response.status()));
    }

    let body = response.text().await?;
    windows_from_json(&body, tz)
}

pub(super) fn windows_from_json(body: &str, tz: Tz) -> Result<Vec<MaintenanceWindow>> {
    let events: EventsResponse = serde_json::from_str(body)?;
    Ok(events
        .items
        .into_iter()
        .filter_map(|event| event_to_window(event, tz))
        .collect())
}

fn event_to_window(event: CalendarEvent, tz: Tz) -> Option<MaintenanceWindow> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }
    let (start, all_day) = parse_event_time(event.start.as_ref()?, tz)?;
    let (end, _) = parse_event_time(event.end.as_ref()?, tz)?;

    Some(MaintenanceWindow {
        summary: event.summary.unwrap_or_else(|| "Maintenance".to_string()),
        description: event.description,
        start,
        end,
        all_day,
    })
}

fn parse_event_time(time: &EventTime, tz: Tz) -> Option<(DateTime<Utc>, bool)> {
    if let Some(dt) = &time.date_time {
        return DateTime::parse_from_rfc3339(dt)
            .ok()
            .map(|d| (d.with_timezone(&Utc), false));
    }
    if let Some(date) = &time.date {
        let naive = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?;
        let local = tz.from_local_datetime(&naive).earliest()?;
        return Some((local.with_timezone(&Utc), true));
    }
    None
}
