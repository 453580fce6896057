//! Time keeping and time formatting

use core::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::config::ClockStyle;

/// Formatted clock text. Always `HH:MM`, well below the 7 character limit.
pub type TimeString = heapless::String<8>;

/// Format hours and minutes of `time` according to `style`.
pub fn format_time(time: &NaiveDateTime, style: ClockStyle) -> TimeString {
    let hour = match style {
        ClockStyle::TwentyFourHour => time.hour(),
        ClockStyle::TwelveHour => time.hour12().1,
    };

    let mut buf = [0u8; 8];
    let mut out = TimeString::new();
    // Both values have two digits, the buffer always fits
    if let Ok(s) = format_no_std::show(&mut buf, format_args!("{:02}:{:02}", hour, time.minute())) {
        let _ = out.push_str(s);
    }
    out
}

/// Whether a tick at `minute` past the hour should ask the phone for the weather.
pub fn should_request_weather(minute: u32, interval: u8) -> bool {
    interval != 0 && minute % interval as u32 == 0
}

/// Wall clock anchored to the uptime counter.
///
/// The watch has no battery backed RTC, so the clock is a reference time plus the
/// seconds elapsed since that reference was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallClock {
    /// UTC time at `reference_uptime`
    reference: NaiveDateTime,
    /// Uptime in seconds at which `reference` was valid
    reference_uptime: u64,
    /// Offset of local time from UTC in seconds
    utc_offset_secs: i32,
}

impl WallClock {
    /// Create a clock from a UTC unix timestamp valid at `uptime_secs`.
    pub fn from_timestamp(timestamp: i64, uptime_secs: u64, utc_offset_secs: i32) -> Self {
        Self {
            reference: NaiveDateTime::from_timestamp_opt(timestamp, 0)
                .unwrap_or_default(),
            reference_uptime: uptime_secs,
            utc_offset_secs,
        }
    }

    /// Current UTC time.
    pub fn utc(&self, uptime_secs: u64) -> NaiveDateTime {
        let elapsed = uptime_secs.saturating_sub(self.reference_uptime);
        self.reference + Duration::seconds(elapsed as i64)
    }

    /// Current local time.
    pub fn local(&self, uptime_secs: u64) -> NaiveDateTime {
        self.utc(uptime_secs) + Duration::seconds(self.utc_offset_secs.into())
    }

    /// Seconds until the next full minute of local time.
    pub fn secs_to_next_minute(&self, uptime_secs: u64) -> u64 {
        60 - u64::from(self.local(uptime_secs).second())
    }

    /// Re-anchor the clock to a new UTC time.
    pub fn set_utc(&mut self, time: NaiveDateTime, uptime_secs: u64) {
        self.reference = time;
        self.reference_uptime = uptime_secs;
    }
}

/// Parse the 10 byte exact time layout of the BLE Current Time Service.
///
/// Layout: year (u16 LE), month, day, hours, minutes, seconds, day of week,
/// fractions of 1/256 s, adjust reason. The day of week and adjust reason are ignored.
pub fn from_cts_bytes(bytes: &[u8]) -> Result<NaiveDateTime, TimeError> {
    if bytes.len() < 10 {
        return Err(TimeError::InvalidLength);
    }
    let year = u16::from_le_bytes([bytes[0], bytes[1]]) as i32;
    let month = bytes[2] as u32;
    let day = bytes[3] as u32;
    let hour = bytes[4] as u32;
    let min = bytes[5] as u32;
    let sec = bytes[6] as u32;
    // Convert fractions_256 to milliseconds
    let milli = bytes[8] as u32 * 1000 / 256;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(TimeError::InvalidDate)?
        .and_hms_milli_opt(hour, min, sec, milli)
        .ok_or(TimeError::InvalidTime)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeError {
    InvalidLength,
    InvalidDate,
    InvalidTime,
}

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeError::InvalidLength => "time payload must be 10 bytes",
            TimeError::InvalidDate => "invalid date",
            TimeError::InvalidTime => "invalid time of day",
        })
    }
}
