//! Today's agenda, read from the ICS text shared through the layout extras.

use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::json;

use crate::error::TileResult;
use crate::model::{TileConfig, TileInstance};
use crate::registry::{TileDefinition, TileSettings};
use crate::render::{ContentHost, TileContext};
use crate::settings::{SettingsContext, SettingsHost};

pub const TYPE_ID: &str = "schedule";
const SHOW_PAST: &str = "showPast";
const MAX_EVENTS: &str = "maxEvents";
const FORMAT_24: &str = "timeFormat24";
const DEFAULT_MAX_EVENTS: u64 = 20;
const REFRESH: Duration = Duration::from_secs(60);

pub const EMPTY_CALENDAR: &str = "Paste ICS in Tile Manager to see schedule.";
pub const NO_EVENTS: &str = "No events for the rest of today.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Local wall-clock start; midnight for all-day events.
    pub start: NaiveDateTime,
    pub all_day: bool,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOptions {
    pub show_past: bool,
    pub max_events: usize,
    pub format_24: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            show_past: false,
            max_events: DEFAULT_MAX_EVENTS as usize,
            format_24: false,
        }
    }
}

impl ScheduleOptions {
    pub fn from_tile(tile: &TileInstance) -> Self {
        let defaults = Self::default();
        Self {
            show_past: tile.config_bool(SHOW_PAST).unwrap_or(defaults.show_past),
            max_events: tile
                .config_u64(MAX_EVENTS)
                .map(|n| n.max(1) as usize)
                .unwrap_or(defaults.max_events),
            format_24: tile.config_bool(FORMAT_24).unwrap_or(defaults.format_24),
        }
    }
}

/// `20240305` is all-day; `20240305T090000` is local; a trailing `Z` is UTC.
fn parse_start(value: &str) -> Option<(NaiveDateTime, bool)> {
    let value = value.trim();
    if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return Some((date.and_time(NaiveTime::MIN), true));
    }
    let (stamp, utc) = match value.strip_suffix('Z') {
        Some(stamp) => (stamp, true),
        None => (value, false),
    };
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S").ok()?;
    if utc {
        Some((Utc.from_utc_datetime(&naive).with_timezone(&Local).naive_local(), false))
    } else {
        Some((naive, false))
    }
}

/// Content lines with folded continuations joined back on.
fn unfolded(ics: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in ics.lines() {
        let raw = raw.trim_end_matches('\r');
        let continuation = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t'));
        if let (Some(rest), Some(last)) = (continuation, lines.last_mut()) {
            last.push_str(rest);
            continue;
        }
        lines.push(raw.to_string());
    }
    lines
}

/// Every VEVENT with a readable DTSTART. Events without a SUMMARY get a
/// placeholder title.
pub fn parse_events(ics: &str) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    let mut current: Option<(Option<(NaiveDateTime, bool)>, Option<String>)> = None;
    for line in unfolded(ics) {
        let line = line.trim();
        if line == "BEGIN:VEVENT" {
            current = Some((None, None));
            continue;
        }
        let Some((start, summary)) = current.as_mut() else {
            continue;
        };
        if line == "END:VEVENT" {
            if let Some((start, all_day)) = *start {
                events.push(CalendarEvent {
                    start,
                    all_day,
                    summary: summary.take().unwrap_or_else(|| "(no title)".to_string()),
                });
            }
            current = None;
        } else if line.starts_with("DTSTART") {
            *start = line.split_once(':').and_then(|(_, value)| parse_start(value));
        } else if let Some(text) = line.strip_prefix("SUMMARY:") {
            *summary = Some(text.replace("\\,", ",").replace("\\;", ";"));
        }
    }
    events
}

/// Events on `now`'s date, sorted, past timed events dropped unless asked for.
pub fn events_for_day(
    events: &[CalendarEvent],
    now: NaiveDateTime,
    options: ScheduleOptions,
) -> Vec<CalendarEvent> {
    let today = now.date();
    let mut selected: Vec<CalendarEvent> = events
        .iter()
        .filter(|event| event.start.date() == today)
        .filter(|event| options.show_past || event.all_day || event.start >= now)
        .cloned()
        .collect();
    selected.sort_by(|a, b| (a.start, !a.all_day).cmp(&(b.start, !b.all_day)));
    selected.truncate(options.max_events);
    selected
}

pub fn format_start(event: &CalendarEvent, format_24: bool) -> String {
    if event.all_day {
        "All day".to_string()
    } else if format_24 {
        event.start.format("%H:%M").to_string()
    } else {
        event.start.format("%-I:%M %p").to_string()
    }
}

pub fn schedule_lines(ics: &str, now: NaiveDateTime, options: ScheduleOptions) -> Vec<String> {
    let mut lines = vec![now.format("%A, %B %-d").to_string()];
    if ics.trim().is_empty() {
        lines.push(EMPTY_CALENDAR.to_string());
        return lines;
    }
    let today = events_for_day(&parse_events(ics), now, options);
    if today.is_empty() {
        lines.push(NO_EVENTS.to_string());
    }
    for event in &today {
        lines.push(format!("{:>8}  {}", format_start(event, options.format_24), event.summary));
    }
    lines
}

fn paint(host: &mut ContentHost, ics: &str, options: ScheduleOptions) {
    host.clear();
    for line in schedule_lines(ics, Local::now().naive_local(), options) {
        host.push_line(line);
    }
}

fn render(host: &mut ContentHost, tile: &TileInstance, ctx: &mut TileContext<'_>) -> TileResult<()> {
    let options = ScheduleOptions::from_tile(tile);
    paint(host, ctx.document().calendar_text(), options);
    // Re-read the document on every refresh so calendar edits show up.
    ctx.lifecycle().every(REFRESH, move |host, ctx| {
        paint(host, ctx.document().calendar_text(), options);
        Ok(())
    });
    Ok(())
}

struct ScheduleSettings;

impl TileSettings for ScheduleSettings {
    fn build_settings(
        &self,
        host: &mut SettingsHost,
        tile: &TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        let options = ScheduleOptions::from_tile(tile);
        host.add_toggle(SHOW_PAST, "Show past events", options.show_past)
            .add_toggle(FORMAT_24, "24-hour time", options.format_24)
            .add_number(MAX_EVENTS, "Max events", options.max_events as f64);
        Ok(())
    }

    fn save_config(
        &self,
        host: &SettingsHost,
        tile: &mut TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        let current = ScheduleOptions::from_tile(tile);
        let max_events = host
            .number(MAX_EVENTS)
            .filter(|n| n.is_finite() && *n >= 1.0)
            .map(|n| n.min(100.0) as u64)
            .unwrap_or(current.max_events as u64);
        tile.config.insert(SHOW_PAST.into(), json!(host.toggle(SHOW_PAST).unwrap_or(false)));
        tile.config.insert(FORMAT_24.into(), json!(host.toggle(FORMAT_24).unwrap_or(false)));
        tile.config.insert(MAX_EVENTS.into(), json!(max_events));
        Ok(())
    }
}

pub fn definition() -> TileDefinition {
    TileDefinition::from_fn(TYPE_ID, render)
        .with_label("Today's Schedule")
        .with_default_size(2, 2)
        .with_initial_config(|| {
            let mut config = TileConfig::new();
            config.insert(SHOW_PAST.into(), json!(false));
            config.insert(MAX_EVENTS.into(), json!(DEFAULT_MAX_EVENTS));
            config.insert(FORMAT_24.into(), json!(false));
            config
        })
        .with_settings(ScheduleSettings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICS: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\nDTSTART;TZID=Europe/Berlin:20240305T090000\r\nSUMMARY:Standup\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nDTSTART:20240305T070000\r\nSUMMARY:Gym\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20240305\r\nSUMMARY:Holiday\\, partial\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nDTSTART:20240305T153000\r\nSUMMARY:Design review with a very\r\n  long title\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nDTSTART:20240306T090000\r\nSUMMARY:Tomorrow\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nDTSTART:garbage\r\nSUMMARY:Broken\r\nEND:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn parses_timed_all_day_and_folded_events() {
        let events = parse_events(ICS);
        assert_eq!(events.len(), 5);
        assert!(events[2].all_day);
        assert_eq!(events[2].summary, "Holiday, partial");
        assert_eq!(events[3].summary, "Design review with a very long title");
    }

    #[test]
    fn keeps_today_and_hides_past_timed_events() {
        let events = parse_events(ICS);
        let today = events_for_day(&events, at(8, 0), ScheduleOptions::default());
        let titles: Vec<_> = today.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(titles, vec!["Holiday, partial", "Standup", "Design review with a very long title"]);

        let options = ScheduleOptions {
            show_past: true,
            max_events: 2,
            format_24: false,
        };
        let capped = events_for_day(&events, at(23, 0), options);
        let titles: Vec<_> = capped.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(titles, vec!["Holiday, partial", "Gym"]);
    }

    #[test]
    fn lines_report_empty_and_exhausted_days() {
        let options = ScheduleOptions::default();
        assert_eq!(schedule_lines("  ", at(8, 0), options)[1], EMPTY_CALENDAR);

        let late = schedule_lines(
            "BEGIN:VEVENT\nDTSTART:20240305T090000\nSUMMARY:Done\nEND:VEVENT",
            at(20, 0),
            options,
        );
        assert_eq!(late, vec!["Tuesday, March 5".to_string(), NO_EVENTS.to_string()]);
    }

    #[test]
    fn start_labels_follow_the_time_format() {
        let events = parse_events(ICS);
        assert_eq!(format_start(&events[0], true), "09:00");
        assert_eq!(format_start(&events[3], false), "3:30 PM");
        assert_eq!(format_start(&events[2], false), "All day");
    }
}
