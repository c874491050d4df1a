//! Persisted layout of the parking state.
//!
//! Both keys hold a JSON array. Field names follow the layout the browser
//! build of the lot manager writes, so existing local data keeps loading.
//!
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::storage::StorageError;
use crate::domain::prelude::*;

pub const OCCUPIED_SPOTS_KEY: &str = "occupiedSpots";
pub const HISTORY_KEY: &str = "history";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OccupiedSpotRecord {
    pub spot_number: SpotNumber,
    pub license_plate: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    /// ISO-8601 instant with millisecond precision (ex. "2024-01-01T00:00:00.000Z").
    pub entry_time: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleExitRecord {
    pub license_plate: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub spot: SpotNumber,
    pub entry_time: String,
    pub exit_time: String,
    pub duration: String,
    pub value: String,
    pub payment_method: PaymentMethod,
}

impl From<&OccupiedSpot> for OccupiedSpotRecord {
    fn from(spot: &OccupiedSpot) -> Self {
        Self {
            spot_number: spot.spot_number,
            license_plate: spot.license_plate.clone(),
            vehicle_type: spot.vehicle_type,
            entry_time: spot.entry_time.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl TryFrom<OccupiedSpotRecord> for OccupiedSpot {
    type Error = StorageError;

    fn try_from(record: OccupiedSpotRecord) -> Result<Self, Self::Error> {
        let entry_time = DateTime::parse_from_rfc3339(&record.entry_time)
            .map_err(|e| StorageError::Deserialize {
                key: OCCUPIED_SPOTS_KEY.to_string(),
                reason: format!("bad entryTime {:?}: {e}", record.entry_time),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            spot_number: record.spot_number,
            license_plate: record.license_plate,
            vehicle_type: record.vehicle_type,
            entry_time,
        })
    }
}

impl From<&VehicleExit> for VehicleExitRecord {
    fn from(exit: &VehicleExit) -> Self {
        Self {
            license_plate: exit.license_plate.clone(),
            vehicle_type: exit.vehicle_type,
            spot: exit.spot,
            entry_time: exit.entry_time.clone(),
            exit_time: exit.exit_time.clone(),
            duration: exit.duration.clone(),
            value: exit.value.clone(),
            payment_method: exit.payment_method,
        }
    }
}

impl From<VehicleExitRecord> for VehicleExit {
    fn from(record: VehicleExitRecord) -> Self {
        Self {
            license_plate: record.license_plate,
            vehicle_type: record.vehicle_type,
            spot: record.spot,
            entry_time: record.entry_time,
            exit_time: record.exit_time,
            duration: record.duration,
            value: record.value,
            payment_method: record.payment_method,
        }
    }
}

pub fn encode_occupied_spots<'a>(
    spots: impl IntoIterator<Item = &'a OccupiedSpot>,
) -> Result<String, StorageError> {
    let records: Vec<OccupiedSpotRecord> = spots.into_iter().map(Into::into).collect();
    serde_json::to_string(&records).map_err(|source| StorageError::Serialize {
        key: OCCUPIED_SPOTS_KEY,
        source,
    })
}

pub fn decode_occupied_spots(serialized: &str) -> Result<Vec<OccupiedSpot>, StorageError> {
    let records: Vec<OccupiedSpotRecord> =
        serde_json::from_str(serialized).map_err(|e| StorageError::Deserialize {
            key: OCCUPIED_SPOTS_KEY.to_string(),
            reason: e.to_string(),
        })?;
    records.into_iter().map(OccupiedSpot::try_from).collect()
}

pub fn encode_history(history: &[VehicleExit]) -> Result<String, StorageError> {
    let records: Vec<VehicleExitRecord> = history.iter().map(Into::into).collect();
    serde_json::to_string(&records).map_err(|source| StorageError::Serialize {
        key: HISTORY_KEY,
        source,
    })
}

pub fn decode_history(serialized: &str) -> Result<Vec<VehicleExit>, StorageError> {
    let records: Vec<VehicleExitRecord> =
        serde_json::from_str(serialized).map_err(|e| StorageError::Deserialize {
            key: HISTORY_KEY.to_string(),
            reason: e.to_string(),
        })?;
    Ok(records.into_iter().map(Into::into).collect())
}
