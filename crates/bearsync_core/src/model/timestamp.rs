//! Epoch conversion between filesystem mtimes and Bear timestamps.
//!
//! Bear stores `ZMODIFICATIONDATE` as seconds since the Core Data reference
//! date (2001-01-01T00:00:00Z). Filesystem mtimes are relative to the unix
//! epoch. The offset between the two is a constant and must be applied the
//! same way in both directions, otherwise an unchanged note would look
//! modified on every pass.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds since 2001-01-01T00:00:00Z, Bear's native epoch.
pub type StoreTime = f64;

/// Seconds between 1970-01-01T00:00:00Z and 2001-01-01T00:00:00Z.
pub const CORE_DATA_EPOCH_OFFSET_SECS: f64 = 978_307_200.0;

/// Converts unix-epoch seconds to store-epoch seconds.
pub fn unix_to_store(unix_secs: f64) -> StoreTime {
    unix_secs - CORE_DATA_EPOCH_OFFSET_SECS
}

/// Converts store-epoch seconds to unix-epoch seconds.
pub fn store_to_unix(store_secs: StoreTime) -> f64 {
    store_secs + CORE_DATA_EPOCH_OFFSET_SECS
}

/// Converts a filesystem timestamp to store-epoch seconds.
pub fn system_time_to_store(time: SystemTime) -> StoreTime {
    let unix_secs = match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    };
    unix_to_store(unix_secs)
}

/// Converts store-epoch seconds back to a filesystem timestamp.
pub fn store_to_system_time(store_secs: StoreTime) -> SystemTime {
    let unix_secs = store_to_unix(store_secs);
    if unix_secs >= 0.0 {
        UNIX_EPOCH + Duration::from_secs_f64(unix_secs)
    } else {
        UNIX_EPOCH - Duration::from_secs_f64(-unix_secs)
    }
}
