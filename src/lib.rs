//! Weather watchface for the PineTime.
//!
//! Shows the current time, asks the companion phone app for the weather twice an hour
//! and shows the battery charge. The platform drives everything through [`app::Event`]s
//! handed to [`app::WatchApp`]; the firmware binary provides the [`app::Host`] for the
//! nRF52832, tests provide their own.

#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod app;
pub mod battery;
pub mod clock;
pub mod config;
pub mod message;
pub mod ui;

pub use app::{AppState, Event, Host, WatchApp};
pub use config::{ClockStyle, ScreenShape, WatchFaceConfig};
