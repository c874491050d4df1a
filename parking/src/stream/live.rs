use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::{sync::broadcast, task::JoinHandle};

use crate::core::prelude::*;
use crate::domain::{billing, prelude::*};

/// Which occupied spots a live view follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watch {
    /// Every occupied spot (the board).
    All,
    /// A single spot (the spot details view).
    Spot(SpotNumber),
}

/// Duration and fare of a parked vehicle at one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveReading {
    pub spot_number: SpotNumber,
    pub license_plate: String,
    pub vehicle_type: VehicleType,
    pub duration: String,
    pub value: String,
}

/// Handle to a running live refresh.
///
/// The refresh runs until the handle is stopped or dropped, so a view that
/// owns it stops ticking as soon as it goes away.
///
pub struct LiveRefresh {
    tx: broadcast::Sender<Vec<LiveReading>>,
    task: JoinHandle<()>,
}

impl LiveRefresh {
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<LiveReading>> {
        self.tx.subscribe()
    }

    pub fn stop(self) {}
}

impl Drop for LiveRefresh {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start refreshing readings for `watch` every `period`.
///
/// The first readings are published right away. Each tick takes a read lock
/// on the store just long enough to compute the readings.
///
pub fn spawn<S>(store: SharedStore<S>, period: Duration, watch: Watch) -> LiveRefresh
where
    S: Storage + 'static,
{
    let (tx, _) = broadcast::channel(16);
    let tx_clone = tx.clone();

    let mut stream = stream_readings_every(store, period, watch);
    let task = tokio::spawn(async move {
        while let Some(readings) = stream.next().await {
            // no receivers is fine, the view may not be listening yet
            let _ = tx_clone.send(readings);
        }
    });

    LiveRefresh { tx, task }
}

/// Readings for `watch` computed against a single instant of the store clock.
pub fn readings<S: Storage>(store: &ParkingStore<S>, watch: Watch) -> Vec<LiveReading> {
    let now = store.clock().now();
    let reading = |spot: &OccupiedSpot| LiveReading {
        spot_number: spot.spot_number,
        license_plate: spot.license_plate.clone(),
        vehicle_type: spot.vehicle_type,
        duration: billing::current_duration(spot, now),
        value: billing::current_value(spot, now),
    };

    match watch {
        Watch::All => store.occupied_spots().values().map(reading).collect(),
        Watch::Spot(spot_number) => store.spot(spot_number).map(reading).into_iter().collect(),
    }
}

/// A stream that produces readings every `period`
///
fn stream_readings_every<S>(
    store: SharedStore<S>,
    period: Duration,
    watch: Watch,
) -> impl Stream<Item = Vec<LiveReading>> + Send
where
    S: Storage + 'static,
{
    let interval = tokio::time::interval(period);
    let stream = futures::stream::unfold((interval, store), move |(mut interval, store)| async move {
        interval.tick().await;
        let current = readings(&*store.read().await, watch);
        Some((current, (interval, store)))
    });

    Box::pin(stream)
}
