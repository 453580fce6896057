//! Watchface configuration

/// Minutes between two weather requests.
pub const REQUEST_INTERVAL_MINUTES: u8 = 30;

/// Physical shape of the screen, changes the vertical placement of the layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScreenShape {
    Rectangular,
    Round,
}

/// Hour display preference of the wearer.
///
/// The watchface asks [`Host::clock_is_24h_style`](crate::Host::clock_is_24h_style)
/// for it on every clock update, so it belongs to the platform rather than to
/// [`WatchFaceConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockStyle {
    /// `%H:%M`
    TwentyFourHour,
    /// `%I:%M`
    TwelveHour,
}

impl ClockStyle {
    pub fn is_24h(self) -> bool {
        self == ClockStyle::TwentyFourHour
    }
}

/// Settings of the watchface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchFaceConfig {
    /// Screen shape
    pub shape: ScreenShape,
    /// Create the battery layer and follow charge changes
    pub show_battery: bool,
    /// Local time offset from UTC in seconds
    pub utc_offset_secs: i32,
    /// Request weather whenever `minute % request_interval == 0`. Zero disables requests.
    pub request_interval: u8,
}

impl WatchFaceConfig {
    /// Settings for the PineTime: square screen, battery shown, UTC+1.
    pub const fn pinetime() -> Self {
        Self {
            shape: ScreenShape::Rectangular,
            show_battery: true,
            utc_offset_secs: 3_600,
            request_interval: REQUEST_INTERVAL_MINUTES,
        }
    }

    /// Same settings without the battery layer.
    pub const fn without_battery(self) -> Self {
        Self {
            show_battery: false,
            ..self
        }
    }
}

impl Default for WatchFaceConfig {
    fn default() -> Self {
        Self {
            shape: ScreenShape::Rectangular,
            show_battery: true,
            utc_offset_secs: 0,
            request_interval: REQUEST_INTERVAL_MINUTES,
        }
    }
}
