use std::{path::PathBuf, str::FromStr, time::Duration};

use chrono::FixedOffset;
use tracing::warn;

use crate::core::prelude::*;

/// Runtime settings, read from the environment.
///
/// Every setting has a default; a value that cannot be parsed is logged and
/// the default is used instead.
///
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the persisted state (PARKING_DATA_DIR).
    pub data_dir: PathBuf,
    /// Live refresh period (PARKING_TICK_MS).
    pub tick: Duration,
    /// Display zone for timestamps (PARKING_UTC_OFFSET_MINUTES).
    pub zone: FixedOffset,
    /// Store event channel capacity (PARKING_EVENT_BUFFER).
    pub event_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        let store = StoreSettings::default();
        Self {
            data_dir: PathBuf::from("./parking-data"),
            tick: Duration::from_millis(1000),
            zone: store.zone,
            event_buffer: store.event_buffer,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let data_dir = lookup("PARKING_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let tick_ms = parse_or(&lookup, "PARKING_TICK_MS", defaults.tick.as_millis() as u64);
        let tick = Duration::from_millis(tick_ms.max(1));

        let offset_minutes = parse_or(
            &lookup,
            "PARKING_UTC_OFFSET_MINUTES",
            defaults.zone.local_minus_utc() / 60,
        );
        let zone = FixedOffset::east_opt(offset_minutes.saturating_mul(60)).unwrap_or_else(|| {
            warn!(offset_minutes, "UTC offset out of range, using the local zone");
            defaults.zone
        });

        let event_buffer = parse_or(&lookup, "PARKING_EVENT_BUFFER", defaults.event_buffer);

        Self {
            data_dir,
            tick,
            zone,
            event_buffer,
        }
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            zone: self.zone,
            event_buffer: self.event_buffer,
        }
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "ignoring malformed setting");
            default
        }),
    }
}
