//! Fare and duration arithmetic for an occupation.
//!
//! Fares are charged proportionally to the exact elapsed time, while the
//! duration shown to the operator is a tiered, truncated rendering of it.
//!
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use super::spot::{OccupiedSpot, VehicleType};

pub const CAR_HOURLY_RATE: f64 = 10.0;
pub const MOTORCYCLE_HOURLY_RATE: f64 = 7.0;

/// Layout used for entry and exit timestamps in the history (dd/mm/yy, HH:MM).
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%y, %H:%M";

/// Same layout with the comma removed, for reading timestamps back.
const TIMESTAMP_PARSE_FORMAT: &str = "%d/%m/%y %H:%M";

const CURRENCY_PREFIX: &str = "R$ ";

/// Time between two instants, in milliseconds.
///
/// A negative span (clock moved backwards) is clamped to zero.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Elapsed {
    millis: i64,
}

impl Elapsed {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::from_millis((end - start).num_milliseconds())
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            millis: millis.max(0),
        }
    }

    pub fn from_secs(secs: i64) -> Self {
        Self::from_millis(secs.saturating_mul(1000))
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Elapsed minutes with the fractional part kept.
    pub fn minutes_exact(&self) -> f64 {
        self.millis as f64 / 60_000.0
    }

    pub fn whole_seconds(&self) -> u64 {
        (self.millis / 1000) as u64
    }
}

/// Amount charged for an occupation, kept at full precision.
///
/// Rounding to cents only happens when the fare is displayed.
///
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Fare(f64);

impl Fare {
    pub fn for_elapsed(vehicle_type: VehicleType, elapsed: Elapsed) -> Self {
        Self(elapsed.minutes_exact() / 60.0 * vehicle_type.hourly_rate())
    }

    pub fn amount(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Fare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_currency(self.0))
    }
}

/// Formats an amount as Brazilian reais (ex. 27.8333 -> "R$ 27,83").
///
/// Exact half-cent amounts round up (0.125 -> "0,13").
///
pub fn format_currency(amount: f64) -> String {
    format!("{CURRENCY_PREFIX}{}", fixed_cents(amount)).replace('.', ",")
}

/// Two-decimal rendering with exact half-cent ties rounded away from zero.
///
/// `{:.2}` rounds exact ties to even. The only binary fractions sitting
/// exactly on a half cent are odd multiples of 1/8, so those are nudged
/// before formatting.
fn fixed_cents(amount: f64) -> String {
    let eighths = amount * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        format!("{:.2}", amount + amount.signum() * 0.001)
    } else {
        format!("{amount:.2}")
    }
}

/// Inverse of [`format_currency`], used to aggregate persisted history values.
pub fn parse_currency(value: &str) -> Option<f64> {
    value
        .trim()
        .strip_prefix(CURRENCY_PREFIX.trim_end())?
        .trim()
        .replace(',', ".")
        .parse()
        .ok()
}

/// Tiered duration: "{h}h {m}min" once hours are present, "{m}min {s}s" under
/// an hour and "{s}s" under a minute. Seconds are truncated, never rounded.
pub fn format_duration(elapsed: Elapsed) -> String {
    let total_seconds = elapsed.whole_seconds();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}min")
    } else if minutes > 0 {
        format!("{minutes}min {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn format_timestamp(instant: DateTime<Utc>, zone: &FixedOffset) -> String {
    instant
        .with_timezone(zone)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Reads back a history timestamp, with or without the comma between date
/// and time ("22/11/25, 06:23" or "22/11/25 06:23").
pub fn parse_timestamp(value: &str, zone: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let cleaned = value.replace(',', "");
    let naive = NaiveDateTime::parse_from_str(cleaned.trim(), TIMESTAMP_PARSE_FORMAT).ok()?;
    zone.from_local_datetime(&naive).single()
}

/// Fare accrued so far by a parked vehicle, as of `now`.
pub fn current_value(spot: &OccupiedSpot, now: DateTime<Utc>) -> String {
    Fare::for_elapsed(spot.vehicle_type, Elapsed::between(spot.entry_time, now)).to_string()
}

/// Time parked so far, as of `now`.
pub fn current_duration(spot: &OccupiedSpot, now: DateTime<Utc>) -> String {
    format_duration(Elapsed::between(spot.entry_time, now))
}
