use std::{collections::BTreeMap, sync::Arc};

use chrono::{FixedOffset, Local, Offset};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use super::{
    clock::Clock,
    storage::{Storage, StorageError},
};
use crate::domain::{
    billing::{self, Elapsed, Fare},
    prelude::*,
};
use crate::models::{self, HISTORY_KEY, OCCUPIED_SPOTS_KEY};

/// A store shared between the presentation layer and the live refresh.
pub type SharedStore<S> = Arc<RwLock<ParkingStore<S>>>;

/// Change notifications published after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Occupied { spot_number: SpotNumber },
    Vacated { record: VehicleExit },
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Zone used to format entry and exit timestamps.
    pub zone: FixedOffset,
    /// Capacity of the event channel.
    pub event_buffer: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            zone: Local::now().offset().fix(),
            event_buffer: 16,
        }
    }
}

/// Owner of the live occupancy and the visit history.
///
/// Every mutation writes the affected state back to storage. Storage
/// failures are logged and otherwise ignored: the in-memory state stays
/// authoritative for the session.
///
pub struct ParkingStore<S> {
    storage: S,
    clock: Arc<dyn Clock>,
    zone: FixedOffset,

    /// Spots currently holding a vehicle, keyed by spot number.
    occupied: BTreeMap<SpotNumber, OccupiedSpot>,

    /// Completed visits, most recent first.
    history: Vec<VehicleExit>,

    /// The sender for store events.
    /// Used to notify views that the state changed.
    events_tx: broadcast::Sender<StoreEvent>,
}

impl<S: Storage> ParkingStore<S> {
    /// Restores the state left in `storage` by a previous session.
    ///
    /// Missing keys start empty. Unreadable keys are logged and also start
    /// empty, independently of each other.
    ///
    pub fn load(storage: S, clock: Arc<dyn Clock>, settings: StoreSettings) -> Self {
        let occupied = load_occupied_spots(&storage);
        let history = load_history(&storage);
        let (events_tx, _) = broadcast::channel(settings.event_buffer.max(1));

        info!(
            occupied = occupied.len(),
            history = history.len(),
            "parking state loaded"
        );

        Self {
            storage,
            clock,
            zone: settings.zone,
            occupied,
            history,
            events_tx,
        }
    }

    pub fn into_shared(self) -> SharedStore<S> {
        Arc::new(RwLock::new(self))
    }

    pub fn occupied_spots(&self) -> &BTreeMap<SpotNumber, OccupiedSpot> {
        &self.occupied
    }

    pub fn spot(&self, spot_number: SpotNumber) -> Option<&OccupiedSpot> {
        self.occupied.get(&spot_number)
    }

    pub fn is_occupied(&self, spot_number: SpotNumber) -> bool {
        self.occupied.contains_key(&spot_number)
    }

    pub fn history(&self) -> &[VehicleExit] {
        &self.history
    }

    pub fn zone(&self) -> &FixedOffset {
        &self.zone
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events_tx.subscribe()
    }

    /// Parks a vehicle on `spot_number`, stamping the entry with the current
    /// instant.
    ///
    /// The plate is expected to be validated already. An existing occupation
    /// of the same spot is replaced without producing a history record.
    ///
    pub fn occupy_spot(
        &mut self,
        spot_number: SpotNumber,
        license_plate: impl Into<String>,
        vehicle_type: VehicleType,
    ) {
        let spot = OccupiedSpot {
            spot_number,
            license_plate: license_plate.into(),
            vehicle_type,
            entry_time: self.clock.now(),
        };

        info!(spot = spot_number, plate = %spot.license_plate, %vehicle_type, "spot occupied");
        if let Some(displaced) = self.occupied.insert(spot_number, spot) {
            warn!(
                spot = spot_number,
                plate = %displaced.license_plate,
                "occupied spot was overwritten, previous vehicle dropped"
            );
        }

        self.persist_occupancy();
        let _ = self.events_tx.send(StoreEvent::Occupied { spot_number });
    }

    /// Releases `spot_number`, charging for the time parked.
    ///
    /// Returns the history record that was created, or `None` when the spot
    /// was not occupied (nothing changes in that case).
    ///
    pub fn vacate_spot(
        &mut self,
        spot_number: SpotNumber,
        payment_method: PaymentMethod,
    ) -> Option<VehicleExit> {
        let Some(spot) = self.occupied.remove(&spot_number) else {
            debug!(spot = spot_number, "vacate ignored, spot is free");
            return None;
        };

        let exit_time = self.clock.now();
        let elapsed = Elapsed::between(spot.entry_time, exit_time);
        let fare = Fare::for_elapsed(spot.vehicle_type, elapsed);

        let record = VehicleExit {
            license_plate: spot.license_plate,
            vehicle_type: spot.vehicle_type,
            spot: spot_number,
            entry_time: billing::format_timestamp(spot.entry_time, &self.zone),
            exit_time: billing::format_timestamp(exit_time, &self.zone),
            duration: billing::format_duration(elapsed),
            value: fare.to_string(),
            payment_method,
        };

        info!(
            spot = spot_number,
            plate = %record.license_plate,
            duration = %record.duration,
            value = %record.value,
            %payment_method,
            "spot vacated"
        );
        self.history.insert(0, record.clone());

        self.persist_history();
        self.persist_occupancy();
        let _ = self.events_tx.send(StoreEvent::Vacated {
            record: record.clone(),
        });

        Some(record)
    }

    /// Fare accrued so far by `spot`. Safe to call as often as needed.
    pub fn calculate_current_value(&self, spot: &OccupiedSpot) -> String {
        billing::current_value(spot, self.clock.now())
    }

    /// Time `spot` has been parked so far.
    pub fn calculate_duration(&self, spot: &OccupiedSpot) -> String {
        billing::current_duration(spot, self.clock.now())
    }

    /// Writes the live occupancy under `occupiedSpots`.
    pub fn persist_occupancy(&mut self) {
        let result = models::encode_occupied_spots(self.occupied.values())
            .and_then(|json| self.storage.set_item(OCCUPIED_SPOTS_KEY, &json));
        log_save_failure(OCCUPIED_SPOTS_KEY, result);
    }

    /// Writes the history under `history`.
    pub fn persist_history(&mut self) {
        let result = models::encode_history(&self.history)
            .and_then(|json| self.storage.set_item(HISTORY_KEY, &json));
        log_save_failure(HISTORY_KEY, result);
    }
}

fn log_save_failure(key: &str, result: Result<(), StorageError>) {
    if let Err(e) = result {
        error!(key, error = %e, "could not save parking state");
    }
}

fn load_occupied_spots<S: Storage>(storage: &S) -> BTreeMap<SpotNumber, OccupiedSpot> {
    let loaded = storage
        .get_item(OCCUPIED_SPOTS_KEY)
        .and_then(|serialized| serialized.as_deref().map(models::decode_occupied_spots).transpose());

    match loaded {
        Ok(spots) => spots
            .unwrap_or_default()
            .into_iter()
            .map(|spot| (spot.spot_number, spot))
            .collect(),
        Err(e) => {
            error!(key = OCCUPIED_SPOTS_KEY, error = %e, "could not load occupied spots");
            BTreeMap::new()
        }
    }
}

fn load_history<S: Storage>(storage: &S) -> Vec<VehicleExit> {
    let loaded = storage
        .get_item(HISTORY_KEY)
        .and_then(|serialized| serialized.as_deref().map(models::decode_history).transpose());

    match loaded {
        Ok(history) => history.unwrap_or_default(),
        Err(e) => {
            error!(key = HISTORY_KEY, error = %e, "could not load history");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{clock::ManualClock, storage::MemoryStorage};
    use chrono::{TimeDelta, TimeZone, Utc};

    fn store_at(storage: MemoryStorage) -> (ParkingStore<MemoryStorage>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 11, 22, 9, 0, 0).unwrap());
        let settings = StoreSettings {
            zone: FixedOffset::east_opt(0).unwrap(),
            event_buffer: 8,
        };
        let store = ParkingStore::load(storage, Arc::new(clock.clone()), settings);
        (store, clock)
    }

    #[test]
    fn occupy_records_entry_and_persists() {
        let (mut store, clock) = store_at(MemoryStorage::new());

        store.occupy_spot(5, "ABC1D23", VehicleType::Car);

        let spot = store.spot(5).unwrap();
        assert_eq!(spot.license_plate, "ABC1D23");
        assert_eq!(spot.entry_time, clock.now());
        assert!(store
            .storage()
            .get_item(OCCUPIED_SPOTS_KEY)
            .unwrap()
            .unwrap()
            .contains("\"spotNumber\":5"));
    }

    #[test]
    fn vacating_a_free_spot_changes_nothing() {
        let (mut store, _) = store_at(MemoryStorage::new());
        let mut events = store.subscribe();

        assert_eq!(store.vacate_spot(7, PaymentMethod::Cash), None);
        assert!(store.history().is_empty());
        assert!(store.storage().get_item(HISTORY_KEY).unwrap().is_none());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn overwriting_an_occupied_spot_keeps_the_newest_vehicle() {
        let (mut store, clock) = store_at(MemoryStorage::new());

        store.occupy_spot(3, "ABC-1234", VehicleType::Car);
        clock.advance(TimeDelta::minutes(10));
        store.occupy_spot(3, "XYZ9K88", VehicleType::Car);

        assert_eq!(store.occupied_spots().len(), 1);
        assert_eq!(store.spot(3).unwrap().license_plate, "XYZ9K88");
        assert_eq!(store.spot(3).unwrap().entry_time, clock.now());
        assert!(store.history().is_empty());
    }

    #[test]
    fn mutations_are_published_to_subscribers() {
        let (mut store, clock) = store_at(MemoryStorage::new());
        let mut events = store.subscribe();

        store.occupy_spot(31, "SMO-3210", VehicleType::Motorcycle);
        clock.advance(TimeDelta::minutes(30));
        let record = store.vacate_spot(31, PaymentMethod::Card).unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::Occupied { spot_number: 31 }
        );
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Vacated { record });
    }

    #[test]
    fn live_queries_do_not_mutate() {
        let (mut store, clock) = store_at(MemoryStorage::new());
        store.occupy_spot(2, "ABC-1234", VehicleType::Car);
        clock.advance(TimeDelta::seconds(125));

        let spot = store.spot(2).unwrap().clone();
        assert_eq!(store.calculate_duration(&spot), "2min 5s");
        assert_eq!(store.calculate_duration(&spot), "2min 5s");
        assert_eq!(
            store.calculate_current_value(&spot),
            store.calculate_current_value(&spot)
        );
        assert_eq!(store.occupied_spots().len(), 1);
        assert!(store.history().is_empty());
    }
}
