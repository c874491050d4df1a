use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone, Utc};
use parking::{
    core::prelude::*,
    domain::prelude::*,
    models::{HISTORY_KEY, OCCUPIED_SPOTS_KEY},
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 22, 9, 23, 0).unwrap()
}

fn settings() -> StoreSettings {
    StoreSettings {
        zone: FixedOffset::west_opt(3 * 3600).unwrap(),
        event_buffer: 16,
    }
}

fn load<S: Storage>(storage: S, clock: &ManualClock) -> ParkingStore<S> {
    ParkingStore::load(storage, Arc::new(clock.clone()), settings())
}

#[test]
fn car_parked_for_ninety_minutes_pays_fifteen() {
    let clock = ManualClock::new(t0());
    let mut store = load(MemoryStorage::new(), &clock);

    store.occupy_spot(5, "ABC1D23", VehicleType::Car);
    assert_eq!(store.occupied_spots().len(), 1);
    assert_eq!(store.spot(5).unwrap().entry_time, t0());

    clock.advance(TimeDelta::minutes(90));
    let record = store.vacate_spot(5, PaymentMethod::Pix).unwrap();

    assert!(!store.is_occupied(5));
    assert_eq!(store.history().len(), 1);
    assert_eq!(store.history()[0], record);
    assert_eq!(record.spot, 5);
    assert_eq!(record.license_plate, "ABC1D23");
    assert_eq!(record.value, "R$ 15,00");
    assert_eq!(record.duration, "1h 30min");
    assert_eq!(record.entry_time, "22/11/25, 06:23");
    assert_eq!(record.exit_time, "22/11/25, 07:53");
    assert_eq!(record.payment_method, PaymentMethod::Pix);
}

#[test]
fn motorcycle_parked_for_half_an_hour_pays_three_fifty() {
    let clock = ManualClock::new(t0());
    let mut store = load(MemoryStorage::new(), &clock);

    store.occupy_spot(31, "SMO-3210", VehicleType::Motorcycle);
    clock.advance(TimeDelta::minutes(30));

    let spot = store.spot(31).unwrap().clone();
    assert_eq!(store.calculate_current_value(&spot), "R$ 3,50");
    assert_eq!(store.calculate_duration(&spot), "30min 0s");

    let record = store.vacate_spot(31, PaymentMethod::Cash).unwrap();
    assert_eq!(record.value, "R$ 3,50");
    assert_eq!(record.vehicle_type, VehicleType::Motorcycle);
}

#[test]
fn half_cent_stays_are_charged_up() {
    let clock = ManualClock::new(t0());
    let mut store = load(MemoryStorage::new(), &clock);

    store.occupy_spot(2, "ABC-1234", VehicleType::Car);
    clock.advance(TimeDelta::milliseconds(45_000));

    let spot = store.spot(2).unwrap().clone();
    assert_eq!(store.calculate_current_value(&spot), "R$ 0,13");

    let record = store.vacate_spot(2, PaymentMethod::Pix).unwrap();
    assert_eq!(record.value, "R$ 0,13");
    assert_eq!(record.duration, "45s");
}

#[test]
fn history_is_most_recent_first() {
    let clock = ManualClock::new(t0());
    let mut store = load(MemoryStorage::new(), &clock);

    store.occupy_spot(1, "AAA-1111", VehicleType::Car);
    store.occupy_spot(2, "BBB-2222", VehicleType::Car);
    clock.advance(TimeDelta::seconds(45));
    store.vacate_spot(1, PaymentMethod::Card);
    clock.advance(TimeDelta::seconds(80));
    store.vacate_spot(2, PaymentMethod::Pix);

    let spots: Vec<_> = store.history().iter().map(|r| r.spot).collect();
    assert_eq!(spots, vec![2, 1]);
    assert_eq!(store.history()[0].duration, "2min 5s");
    assert_eq!(store.history()[1].duration, "45s");
    assert!(store.occupied_spots().is_empty());
}

#[test]
fn state_survives_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(t0());

    let entry_with_millis = t0() + TimeDelta::milliseconds(321);
    {
        let mut store = load(FileStorage::open(dir.path()).unwrap(), &clock);
        store.occupy_spot(7, "ABC-1234", VehicleType::Car);
        clock.advance(TimeDelta::hours(1));
        store.vacate_spot(7, PaymentMethod::Card);

        clock.set(entry_with_millis);
        store.occupy_spot(40, "XYZ9K88", VehicleType::Motorcycle);
    }

    let reloaded = load(FileStorage::open(dir.path()).unwrap(), &clock);

    let spot = reloaded.spot(40).unwrap();
    assert_eq!(spot.license_plate, "XYZ9K88");
    assert_eq!(spot.vehicle_type, VehicleType::Motorcycle);
    assert_eq!(spot.entry_time, entry_with_millis);
    assert!(!reloaded.is_occupied(7));

    assert_eq!(reloaded.history().len(), 1);
    assert_eq!(reloaded.history()[0].value, "R$ 10,00");
    assert_eq!(reloaded.history()[0].duration, "1h 0min");
}

#[test]
fn persisted_layout_matches_browser_keys() {
    let clock = ManualClock::new(t0());
    let mut store = load(MemoryStorage::new(), &clock);

    store.occupy_spot(5, "ABC1D23", VehicleType::Car);
    clock.advance(TimeDelta::minutes(2));
    store.vacate_spot(5, PaymentMethod::Pix);
    store.occupy_spot(6, "ABC-1234", VehicleType::Car);

    let occupied: serde_json::Value =
        serde_json::from_str(&store.storage().get_item(OCCUPIED_SPOTS_KEY).unwrap().unwrap())
            .unwrap();
    assert_eq!(
        occupied,
        serde_json::json!([{
            "spotNumber": 6,
            "licensePlate": "ABC-1234",
            "type": "car",
            "entryTime": "2025-11-22T09:25:00.000Z",
        }])
    );

    let history: serde_json::Value =
        serde_json::from_str(&store.storage().get_item(HISTORY_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(
        history,
        serde_json::json!([{
            "licensePlate": "ABC1D23",
            "type": "car",
            "spot": 5,
            "entryTime": "22/11/25, 06:23",
            "exitTime": "22/11/25, 06:25",
            "duration": "2min 0s",
            "value": "R$ 0,33",
            "paymentMethod": "pix",
        }])
    );
}

#[test]
fn corrupt_history_falls_back_to_empty() {
    let clock = ManualClock::new(t0());
    let occupied = r#"[{"spotNumber":3,"licensePlate":"ABC-1234","type":"car","entryTime":"2025-11-22T08:00:00.000Z"}]"#;
    let storage = MemoryStorage::new()
        .with_item(OCCUPIED_SPOTS_KEY, occupied)
        .with_item(HISTORY_KEY, "{definitely not json");

    let store = load(storage, &clock);

    assert!(store.history().is_empty());
    assert_eq!(store.occupied_spots().len(), 1);
    assert_eq!(
        store.calculate_current_value(store.spot(3).unwrap()),
        "R$ 13,83"
    );
}

#[test]
fn corrupt_occupancy_falls_back_to_empty() {
    let clock = ManualClock::new(t0());
    let storage = MemoryStorage::new()
        .with_item(OCCUPIED_SPOTS_KEY, r#"{"spotNumber":1}"#)
        .with_item(HISTORY_KEY, "[]");

    let mut store = load(storage, &clock);
    assert!(store.occupied_spots().is_empty());
    assert!(store.history().is_empty());

    // the store keeps working and overwrites the bad value on the next change
    store.occupy_spot(1, "ABC-1234", VehicleType::Car);
    assert!(store
        .storage()
        .get_item(OCCUPIED_SPOTS_KEY)
        .unwrap()
        .unwrap()
        .starts_with('['));
}

/// Storage whose writes always fail, like a browser with a full quota.
struct FullStorage;

impl Storage for FullStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set_item(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "quota exceeded",
        )))
    }

    fn remove_item(&mut self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[test]
fn failed_writes_do_not_interrupt_the_session() {
    let clock = ManualClock::new(t0());
    let mut store = load(FullStorage, &clock);

    store.occupy_spot(9, "ABC-1234", VehicleType::Car);
    clock.advance(TimeDelta::minutes(6));
    let record = store.vacate_spot(9, PaymentMethod::Cash).unwrap();

    assert_eq!(record.value, "R$ 1,00");
    assert_eq!(store.history().len(), 1);
}
