pub mod clock;
pub mod state;
pub mod stats;
pub mod storage;

pub mod prelude {
    pub use super::{
        clock::{Clock, ManualClock, SystemClock},
        state::{ParkingStore, SharedStore, StoreEvent, StoreSettings},
        storage::{FileStorage, MemoryStorage, Storage, StorageError},
    };
}
