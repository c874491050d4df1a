//! Read-only figures derived from the store, for the overview screen.
//!
use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate};

use crate::domain::{billing, plate, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyStats {
    pub cars: usize,
    pub car_capacity: usize,
    pub motorcycles: usize,
    pub motorcycle_capacity: usize,
}

impl OccupancyStats {
    pub fn from_spots(spots: &BTreeMap<SpotNumber, OccupiedSpot>, layout: &LotLayout) -> Self {
        let count = |vehicle_type: VehicleType| {
            spots
                .values()
                .filter(|spot| spot.vehicle_type == vehicle_type)
                .count()
        };

        Self {
            cars: count(VehicleType::Car),
            car_capacity: layout.capacity(VehicleType::Car),
            motorcycles: count(VehicleType::Motorcycle),
            motorcycle_capacity: layout.capacity(VehicleType::Motorcycle),
        }
    }

    pub fn total(&self) -> usize {
        self.cars + self.motorcycles
    }

    pub fn capacity(&self) -> usize {
        self.car_capacity + self.motorcycle_capacity
    }

    pub fn car_percent(&self) -> u32 {
        percent(self.cars, self.car_capacity)
    }

    pub fn motorcycle_percent(&self) -> u32 {
        percent(self.motorcycles, self.motorcycle_capacity)
    }

    pub fn total_percent(&self) -> u32 {
        percent(self.total(), self.capacity())
    }
}

/// Whole percentage, halves rounded up.
fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0 + 0.5).floor() as u32
}

/// History records whose plate contains `query`.
///
/// The query goes through the same normalization as the plate input, so
/// "abc1" finds "ABC-1234". An empty query returns everything.
///
pub fn search_history<'a>(history: &'a [VehicleExit], query: &str) -> Vec<&'a VehicleExit> {
    let needle = plate::format_plate(query);
    history
        .iter()
        .filter(|record| needle.is_empty() || record.license_plate.contains(&needle))
        .collect()
}

/// Exits that happened on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailySummary {
    pub exits: usize,
    pub earnings: f64,
    /// Mean stay in whole minutes, `None` when there were no exits.
    pub average_stay_minutes: Option<i64>,
}

impl DailySummary {
    /// Aggregates the history for `date` in `zone`.
    ///
    /// History only keeps display strings, so values and timestamps are read
    /// back from them; records that cannot be read are left out.
    ///
    pub fn for_date(history: &[VehicleExit], date: NaiveDate, zone: &FixedOffset) -> Self {
        let mut exits = 0;
        let mut earnings = 0.0;
        let mut stay_minutes = 0;

        for record in history {
            let (Some(entry), Some(exit), Some(value)) = (
                billing::parse_timestamp(&record.entry_time, zone),
                billing::parse_timestamp(&record.exit_time, zone),
                billing::parse_currency(&record.value),
            ) else {
                continue;
            };
            if exit.date_naive() != date {
                continue;
            }

            exits += 1;
            earnings += value;
            stay_minutes += (exit - entry).num_minutes().max(0);
        }

        Self {
            exits,
            earnings,
            average_stay_minutes: (exits > 0).then(|| stay_minutes / exits as i64),
        }
    }
}
