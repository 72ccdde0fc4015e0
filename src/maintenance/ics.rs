//! ICS feed fallback
//!
//! A small reader for the VEVENT subset Google's public ICS exports use:
//! folded lines, DTSTART/DTEND with optional VALUE=DATE or TZID params,
//! and backslash-escaped text. Embedded components such as VALARM are
//! skipped whole; anything else unrecognized is ignored line by line.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::{http_client, MaintenanceWindow};

pub(super) async fn fetch_events(url: &str, tz: Tz) -> Result<Vec<MaintenanceWindow>> {
    let response = http_client()?.get(url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("ICS feed returned {}", response.status()));
    }
    let body = response.text().await?;
    Ok(parse(&body, tz))
}

/// Parse VEVENT blocks into windows. Events with an unparseable or
/// missing start are dropped; a missing end defaults to one day for
/// all-day events and one hour otherwise.
pub(super) fn parse(input: &str, tz: Tz) -> Vec<MaintenanceWindow> {
    let mut windows = Vec::new();
    let mut current: Option<VEvent> = None;
    let mut nested = 0usize;

    for line in unfold(input) {
        // Components inside a VEVENT (Google exports embed VALARM blocks)
        // carry their own SUMMARY/DESCRIPTION; skip to the matching END
        if current.is_some() && line.starts_with("BEGIN:") {
            nested += 1;
            continue;
        }
        if nested > 0 {
            if line.starts_with("END:") {
                nested -= 1;
            }
            continue;
        }
        if line == "BEGIN:VEVENT" {
            current = Some(VEvent::default());
            continue;
        }
        if line == "END:VEVENT" {
            if let Some(event) = current.take() {
                if let Some(window) = event.build(tz) {
                    windows.push(window);
                }
            }
            continue;
        }
        let Some(event) = current.as_mut() else {
            continue;
        };
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (prop, params) = match name.split_once(';') {
            Some((prop, params)) => (prop, params),
            None => (name, ""),
        };
        match prop {
            "SUMMARY" => event.summary = Some(unescape(value)),
            "DESCRIPTION" => event.description = Some(unescape(value)),
            "STATUS" => event.status = Some(value.to_string()),
            "DTSTART" => event.start = Some((params.to_string(), value.to_string())),
            "DTEND" => event.end = Some((params.to_string(), value.to_string())),
            _ => {}
        }
    }

    windows
}

#[derive(Default)]
struct VEvent {
    summary: Option<String>,
    description: Option<String>,
    status: Option<String>,
    start: Option<(String, String)>,
    end: Option<(String, String)>,
}

impl VEvent {
    fn build(self, tz: Tz) -> Option<MaintenanceWindow> {
        if self.status.as_deref() == Some("CANCELLED") {
            return None;
        }
        let (params, value) = self.start?;
        let (start, all_day) = parse_dt(&params, &value, tz)?;
        let end = match self.end {
            Some((params, value)) => parse_dt(&params, &value, tz)?.0,
            None if all_day => start + Duration::days(1),
            None => start + Duration::hours(1),
        };

        Some(MaintenanceWindow {
            summary: self.summary.unwrap_or_else(|| "Maintenance".to_string()),
            description: self.description,
            start,
            end,
            all_day,
        })
    }
}

/// RFC 5545 line unfolding: a line starting with space or tab continues
/// the previous line.
fn unfold(input: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in input.lines() {
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        lines.push(raw.to_string());
    }
    lines
}

fn parse_dt(params: &str, value: &str, tz: Tz) -> Option<(DateTime<Utc>, bool)> {
    let value = value.trim();

    // All-day dates: 20260112. Exact match; VALUE=DATE-TIME is timed.
    if params.split(';').any(|p| p == "VALUE=DATE") || (value.len() == 8 && !value.contains('T')) {
        let naive = NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?;
        let local = tz.from_local_datetime(&naive).earliest()?;
        return Some((local.with_timezone(&Utc), true));
    }

    // UTC timestamps: 20260112T030000Z
    if let Some(stripped) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S").ok()?;
        return Some((Utc.from_utc_datetime(&naive), false));
    }

    // Local timestamps, zone from TZID or the site default
    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
    let zone = tzid_param(params)
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(tz);
    let local = zone.from_local_datetime(&naive).earliest()?;
    Some((local.with_timezone(&Utc), false))
}

fn tzid_param(params: &str) -> Option<&str> {
    params.split(';').find_map(|p| p.strip_prefix("TZID="))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}
