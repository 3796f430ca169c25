use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use serde_json::json;

use crate::error::TileResult;
use crate::model::{TileConfig, TileInstance};
use crate::registry::{TileDefinition, TileSettings};
use crate::render::{ContentHost, TileContext};
use crate::settings::{SettingsContext, SettingsHost};

pub const TYPE_ID: &str = "clock";
const FORMAT_24: &str = "timeFormat24";
const TICK: Duration = Duration::from_secs(1);

/// Time line followed by the date line.
pub fn clock_lines<Tz: TimeZone>(now: &DateTime<Tz>, format_24: bool) -> [String; 2]
where
    Tz::Offset: std::fmt::Display,
{
    let time = if format_24 {
        now.format("%H:%M:%S").to_string()
    } else {
        now.format("%-I:%M:%S %p").to_string()
    };
    [time, now.format("%a, %b %-d %Y").to_string()]
}

fn paint(host: &mut ContentHost, format_24: bool) {
    host.clear();
    for line in clock_lines(&Local::now(), format_24) {
        host.push_line(line);
    }
}

fn render(host: &mut ContentHost, tile: &TileInstance, ctx: &mut TileContext<'_>) -> TileResult<()> {
    let format_24 = tile.config_bool(FORMAT_24).unwrap_or(false);
    paint(host, format_24);
    ctx.lifecycle().every(TICK, move |host, _ctx| {
        paint(host, format_24);
        Ok(())
    });
    Ok(())
}

struct ClockSettings;

impl TileSettings for ClockSettings {
    fn build_settings(
        &self,
        host: &mut SettingsHost,
        tile: &TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        host.add_toggle(FORMAT_24, "24-hour time", tile.config_bool(FORMAT_24).unwrap_or(false));
        Ok(())
    }

    fn save_config(
        &self,
        host: &SettingsHost,
        tile: &mut TileInstance,
        _ctx: &SettingsContext<'_>,
    ) -> TileResult<()> {
        let on = host.toggle(FORMAT_24).unwrap_or(false);
        tile.config.insert(FORMAT_24.into(), json!(on));
        Ok(())
    }
}

pub fn definition() -> TileDefinition {
    TileDefinition::from_fn(TYPE_ID, render)
        .with_label("Clock")
        .with_initial_config(|| {
            let mut config = TileConfig::new();
            config.insert(FORMAT_24.into(), json!(false));
            config
        })
        .with_settings(ClockSettings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn formats_twelve_and_twenty_four_hour_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(clock_lines(&at, true), ["14:07:09".to_string(), "Tue, Mar 5 2024".to_string()]);
        assert_eq!(clock_lines(&at, false)[0], "2:07:09 PM");
    }
}
