//! Time keeping module for PineTime

use core::cell::RefCell;

use chrono::NaiveDateTime;
use embassy_sync::blocking_mutex::{raw::ThreadModeRawMutex, Mutex};
use embassy_time::Instant;
use pinetime_weatherface::clock::WallClock;

/// Wall clock shared between the BLE and watchface tasks.
static CLOCK: Mutex<ThreadModeRawMutex, RefCell<Option<WallClock>>> =
    Mutex::new(RefCell::new(None));

fn uptime() -> u64 {
    Instant::now().as_secs()
}

/// Start the clock from a UTC unix timestamp on boot
pub fn init(timestamp: i64, utc_offset_secs: i32) {
    let clock = WallClock::from_timestamp(timestamp, uptime(), utc_offset_secs);
    CLOCK.lock(|c| *c.borrow_mut() = Some(clock));
}

/// Set the current UTC time, e.g. from the phone
pub fn set_utc(time: NaiveDateTime) {
    CLOCK.lock(|c| {
        if let Some(clock) = c.borrow_mut().as_mut() {
            clock.set_utc(time, uptime());
        }
    });
}

/// Current local time
pub fn local_time() -> NaiveDateTime {
    CLOCK.lock(|c| {
        c.borrow()
            .map(|clock| clock.local(uptime()))
            .unwrap_or_default()
    })
}

/// Seconds until the next minute starts
pub fn secs_to_next_minute() -> u64 {
    CLOCK.lock(|c| {
        c.borrow()
            .map(|clock| clock.secs_to_next_minute(uptime()))
            .unwrap_or(60)
    })
}
