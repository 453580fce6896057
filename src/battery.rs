//! Battery charge state
//!
//! Voltage conversion based upon https://github.com/dbrgn/pinetime-rtic/blob/master/pinetime-rtic/src/battery.rs
//! and https://wiki.pine64.org/wiki/PineTime.

/// Charge state as reported to the watchface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryChargeState {
    /// Battery capacity in percent (0–100)
    pub charge_percent: u8,
    /// Charger is actively charging
    pub is_charging: bool,
}

impl BatteryChargeState {
    pub fn new(charge_percent: u8, is_charging: bool) -> Self {
        Self {
            charge_percent: charge_percent.min(100),
            is_charging,
        }
    }
}

/// Convert a 12 bit SAADC sample of the battery voltage pin into millivolts.
///
/// The battery is measured through a 1:2 divider against the 3.3 V reference, see
/// https://wiki.pine64.org/wiki/PineTime. Negative samples read as 0.
pub fn millivolts_from_adc(raw: i16) -> u16 {
    let raw = raw.clamp(0, 4095) as u32;
    // Use u32 during calculation to prevent overflow
    (raw * 2000 / 1241) as u16
}

/// Estimate the battery capacity in percent from its voltage in millivolts.
pub fn percent_from_millivolts(voltage: u16) -> u8 {
    // Use fixed data points and linear interpolation in between
    (match voltage {
        0..=3449 => 0,
        3450..=3699 => (voltage - 3450) / 5,
        3700..=4199 => 50 + (voltage - 3700) / 10,
        _ => 100,
    }) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_at_data_points() {
        assert_eq!(percent_from_millivolts(3000), 0);
        assert_eq!(percent_from_millivolts(3450), 0);
        assert_eq!(percent_from_millivolts(3700), 50);
        assert_eq!(percent_from_millivolts(4199), 99);
        assert_eq!(percent_from_millivolts(4200), 100);
        assert_eq!(percent_from_millivolts(u16::MAX), 100);
    }

    #[test]
    fn adc_conversion() {
        assert_eq!(millivolts_from_adc(0), 0);
        assert_eq!(millivolts_from_adc(-5), 0);
        // Full scale is 2 * 3.3 V
        assert_eq!(millivolts_from_adc(4095), 6599);
        assert_eq!(millivolts_from_adc(i16::MAX), 6599);
    }

    #[test]
    fn charge_state_is_clamped() {
        assert_eq!(BatteryChargeState::new(250, false).charge_percent, 100);
    }

    proptest::proptest! {
        #[test]
        fn percent_is_monotonic_and_bounded(a in 0u16..=u16::MAX, b in 0u16..=u16::MAX) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            proptest::prop_assert!(percent_from_millivolts(lo) <= percent_from_millivolts(hi));
            proptest::prop_assert!(percent_from_millivolts(hi) <= 100);
        }
    }
}
