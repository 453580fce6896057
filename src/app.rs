//! Watchface application
//!
//! [`WatchApp`] holds everything the watchface remembers between events and reacts to
//! the [`Event`]s the platform delivers. The platform itself is reached through the
//! [`Host`] trait.

use chrono::{NaiveDateTime, Timelike};
use embedded_graphics::geometry::Size;
use heapless::String;

use crate::{
    battery::BatteryChargeState,
    clock::{format_time, should_request_weather, TimeString},
    config::{ClockStyle, WatchFaceConfig},
    fmt::{debug, error, info, warn},
    message::{AppMessageResult, Dictionary, KEY_CONDITIONS, KEY_TEMPERATURE},
    ui::{write_truncated, WatchFace, WeatherWatchface, TEXT_CAPACITY},
};

/// Services the platform provides to the watchface.
pub trait Host {
    /// Current local time
    fn local_time(&self) -> NaiveDateTime;

    /// Wearer's hour display preference
    fn clock_is_24h_style(&self) -> bool;

    /// Current battery state, read on demand
    fn battery_state(&self) -> BatteryChargeState;

    /// Queue a message for the companion app. The outcome of an accepted message is
    /// reported later through [`Event::OutboxSent`] or [`Event::OutboxFailed`].
    fn outbox_send(&mut self, message: &Dictionary) -> Result<(), AppMessageResult>;
}

/// Something happened on the platform.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A new minute started
    Tick(NaiveDateTime),
    /// The companion app sent a message
    InboxReceived(Dictionary),
    /// An incoming message could not be delivered
    InboxDropped(AppMessageResult),
    /// The companion app received our message
    OutboxSent,
    /// Our message did not reach the companion app
    OutboxFailed(AppMessageResult),
    /// Battery charge or charger state changed
    BatteryChanged(BatteryChargeState),
    /// The window became visible
    WindowLoad(Size),
    /// The window was hidden
    WindowUnload,
}

/// Values shown on the face, kept across window unloads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppState {
    /// Last formatted clock text
    pub time: Option<TimeString>,
    /// Last weather line received
    pub weather: Option<String<TEXT_CAPACITY>>,
    /// Last battery charge in percent
    pub battery_level: Option<u8>,
}

/// The watchface application.
pub struct WatchApp<H: Host> {
    host: H,
    config: WatchFaceConfig,
    face: WeatherWatchface,
    state: AppState,
}

impl<H: Host> WatchApp<H> {
    pub fn new(host: H, config: WatchFaceConfig) -> Self {
        Self {
            face: WeatherWatchface::new(&config),
            host,
            config,
            state: AppState::default(),
        }
    }

    /// Show the window and bring every layer up to date.
    pub fn init(&mut self, bounds: Size) {
        self.on_window_load(bounds);
        self.update_time();

        if self.config.show_battery {
            // Show battery at start
            let state = self.host.battery_state();
            self.on_battery(state);
        }
        info!("Watchface started");
    }

    /// Hide the window.
    pub fn deinit(&mut self) {
        self.on_window_unload();
    }

    /// Dispatch one platform event.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Tick(time) => self.on_tick(&time),
            Event::InboxReceived(message) => {
                self.on_inbox_received(&message);
            }
            Event::InboxDropped(reason) => self.on_inbox_dropped(reason),
            Event::OutboxSent => self.on_outbox_sent(),
            Event::OutboxFailed(reason) => self.on_outbox_failed(reason),
            Event::BatteryChanged(state) => self.on_battery(state),
            Event::WindowLoad(bounds) => self.on_window_load(bounds),
            Event::WindowUnload => self.on_window_unload(),
        }
    }

    /// Minute tick: refresh the clock and ask for the weather on schedule.
    pub fn on_tick(&mut self, time: &NaiveDateTime) {
        self.show_time(time);

        // Get updates every 30 min
        if should_request_weather(time.minute(), self.config.request_interval) {
            self.request_weather();
        }
    }

    /// Read the clock from the host and show it.
    pub fn update_time(&mut self) {
        let now = self.host.local_time();
        self.show_time(&now);
    }

    /// Ask the companion app to fetch the weather now.
    pub fn request_weather(&mut self) {
        debug!("Requesting weather");
        if let Err(reason) = self.host.outbox_send(&Dictionary::weather_request()) {
            self.on_outbox_failed(reason);
        }
    }

    /// Show the weather from a message. Messages lacking the temperature or the
    /// conditions leave the display as it is. Returns whether the weather changed.
    pub fn on_inbox_received(&mut self, message: &Dictionary) -> bool {
        let temperature = message.find(KEY_TEMPERATURE).and_then(|t| t.value.as_i32());
        let conditions = message.find(KEY_CONDITIONS).and_then(|t| t.value.as_str());

        let (Some(temperature), Some(conditions)) = (temperature, conditions) else {
            debug!("Ignoring message without weather data");
            return false;
        };

        let mut temperature_text: String<7> = String::new();
        write_truncated(&mut temperature_text, format_args!("{}°F", temperature));
        let mut text: String<TEXT_CAPACITY> = String::new();
        write_truncated(&mut text, format_args!("{} {}", temperature_text, conditions));

        self.face.set_weather(&text);
        self.state.weather = Some(text);
        true
    }

    pub fn on_inbox_dropped(&mut self, reason: AppMessageResult) {
        error!("Message dropped! ({:?})", reason);
    }

    pub fn on_outbox_failed(&mut self, reason: AppMessageResult) {
        error!("Outbox send failed! ({:?})", reason);
    }

    pub fn on_outbox_sent(&mut self) {
        info!("Outbox send success!");
    }

    /// Battery charge changed.
    pub fn on_battery(&mut self, state: BatteryChargeState) {
        let level = state.charge_percent.min(100);
        self.state.battery_level = Some(level);
        if self.config.show_battery {
            self.show_battery(level);
        }
    }

    /// Create the widgets and re-apply everything already known.
    pub fn on_window_load(&mut self, bounds: Size) {
        if self.face.is_loaded() {
            warn!("Window already loaded");
            return;
        }
        self.face.load(bounds);

        if let Some(time) = &self.state.time {
            self.face.set_time(time);
        }
        if let Some(weather) = &self.state.weather {
            self.face.set_weather(weather);
        }
        if let Some(level) = self.state.battery_level {
            if self.config.show_battery {
                self.show_battery(level);
            }
        }
    }

    pub fn on_window_unload(&mut self) {
        self.face.unload();
    }

    pub fn face(&self) -> &WeatherWatchface {
        &self.face
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn clock_style(&self) -> ClockStyle {
        if self.host.clock_is_24h_style() {
            ClockStyle::TwentyFourHour
        } else {
            ClockStyle::TwelveHour
        }
    }

    fn show_time(&mut self, time: &NaiveDateTime) {
        let text = format_time(time, self.clock_style());
        self.face.set_time(&text);
        self.state.time = Some(text);
    }

    fn show_battery(&mut self, level: u8) {
        let mut text: String<8> = String::new();
        write_truncated(&mut text, format_args!("{}%", level));
        self.face.set_battery(&text);
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::message::TupleValue;
    use crate::ui::WEATHER_PLACEHOLDER;

    struct MockHost {
        now: NaiveDateTime,
        clock_24h: bool,
        battery: BatteryChargeState,
        sent: std::vec::Vec<Dictionary>,
        refuse: Option<AppMessageResult>,
    }

    impl MockHost {
        fn new() -> Self {
            Self {
                now: at(10, 7),
                clock_24h: true,
                battery: BatteryChargeState::new(64, false),
                sent: std::vec::Vec::new(),
                refuse: None,
            }
        }
    }

    impl Host for MockHost {
        fn local_time(&self) -> NaiveDateTime {
            self.now
        }

        fn clock_is_24h_style(&self) -> bool {
            self.clock_24h
        }

        fn battery_state(&self) -> BatteryChargeState {
            self.battery
        }

        fn outbox_send(&mut self, message: &Dictionary) -> Result<(), AppMessageResult> {
            if let Some(reason) = self.refuse {
                return Err(reason);
            }
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn at(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 3)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn weather(temp: i32, conditions: &str) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert(KEY_TEMPERATURE, TupleValue::Int32(temp)).unwrap();
        dict.insert(
            KEY_CONDITIONS,
            TupleValue::CString(String::try_from(conditions).unwrap()),
        )
        .unwrap();
        dict
    }

    fn started(config: WatchFaceConfig) -> WatchApp<MockHost> {
        let mut app = WatchApp::new(MockHost::new(), config);
        app.init(Size::new(240, 240));
        app
    }

    #[test]
    fn init_shows_time_and_battery() {
        let app = started(WatchFaceConfig::default());
        assert_eq!(app.face().time_text(), Some("10:07"));
        assert_eq!(app.face().battery_text(), Some("64%"));
        assert_eq!(app.face().weather_text(), Some(WEATHER_PLACEHOLDER));
        assert_eq!(app.state().battery_level, Some(64));
    }

    #[test]
    fn twelve_hour_preference() {
        let mut host = MockHost::new();
        host.clock_24h = false;
        host.now = at(15, 4);
        let mut app = WatchApp::new(host, WatchFaceConfig::default());
        app.init(Size::new(240, 240));
        assert_eq!(app.face().time_text(), Some("03:04"));
    }

    #[test]
    fn weather_message_updates_display() {
        let mut app = started(WatchFaceConfig::default());
        assert!(app.on_inbox_received(&weather(72, "Cloudy")));
        assert_eq!(app.face().weather_text(), Some("72°F Cloudy"));
    }

    #[test]
    fn partial_message_keeps_previous_weather() {
        let mut app = started(WatchFaceConfig::default());
        app.on_inbox_received(&weather(72, "Cloudy"));

        let mut only_temp = Dictionary::new();
        only_temp.insert(KEY_TEMPERATURE, TupleValue::Int32(50)).unwrap();
        assert!(!app.on_inbox_received(&only_temp));
        assert_eq!(app.face().weather_text(), Some("72°F Cloudy"));
    }

    #[test]
    fn wrongly_typed_temperature_is_ignored() {
        let mut app = started(WatchFaceConfig::default());
        let mut dict = weather(0, "Clear");
        dict.insert(
            KEY_TEMPERATURE,
            TupleValue::CString(String::try_from("hot").unwrap()),
        )
        .unwrap();
        assert!(!app.on_inbox_received(&dict));
        assert_eq!(app.face().weather_text(), Some(WEATHER_PLACEHOLDER));
    }

    #[test]
    fn long_conditions_are_truncated() {
        let mut app = started(WatchFaceConfig::default());
        app.on_inbox_received(&weather(-5, "Light rain and humid throughout the day"));
        let text = app.face().weather_text().unwrap();
        assert!(text.starts_with("-5°F Light rain"));
        assert_eq!(text.len(), TEXT_CAPACITY);
    }

    #[test]
    fn requests_weather_on_the_half_hour() {
        let mut app = started(WatchFaceConfig::default());
        for minute in 0..60 {
            app.handle(Event::Tick(at(11, minute)));
        }
        assert_eq!(app.host().sent.len(), 2);
        assert!(app.host().sent.iter().all(|m| *m == Dictionary::weather_request()));
        assert_eq!(app.face().time_text(), Some("11:59"));
    }

    #[test]
    fn refused_send_is_not_retried() {
        let mut app = started(WatchFaceConfig::default());
        app.host_mut().refuse = Some(AppMessageResult::NotConnected);
        app.handle(Event::Tick(at(12, 0)));
        app.handle(Event::Tick(at(12, 1)));
        app.host_mut().refuse = None;
        app.handle(Event::Tick(at(12, 2)));
        assert!(app.host().sent.is_empty());
    }

    #[test]
    fn battery_change_updates_display() {
        let mut app = started(WatchFaceConfig::default());
        app.handle(Event::BatteryChanged(BatteryChargeState::new(100, true)));
        assert_eq!(app.face().battery_text(), Some("100%"));
    }

    #[test]
    fn face_without_battery_skips_battery_layer() {
        let mut app = started(WatchFaceConfig::default().without_battery());
        assert_eq!(app.face().battery_text(), None);
        app.handle(Event::BatteryChanged(BatteryChargeState::new(10, false)));
        assert_eq!(app.face().battery_text(), None);
        assert_eq!(app.state().battery_level, Some(10));
    }

    #[test]
    fn late_events_after_unload_do_not_touch_widgets() {
        let mut app = started(WatchFaceConfig::default());
        app.deinit();

        app.handle(Event::InboxReceived(weather(60, "Rain")));
        app.handle(Event::BatteryChanged(BatteryChargeState::new(30, false)));
        app.handle(Event::Tick(at(13, 30)));
        app.handle(Event::OutboxSent);
        app.handle(Event::InboxDropped(AppMessageResult::BufferOverflow));

        assert!(!app.face().is_loaded());
        assert_eq!(app.face().weather_text(), None);
        assert_eq!(app.face().battery_text(), None);
    }

    #[test]
    fn reload_restores_known_values() {
        let mut app = started(WatchFaceConfig::default());
        app.handle(Event::WindowUnload);
        app.handle(Event::InboxReceived(weather(60, "Rain")));
        app.handle(Event::WindowLoad(Size::new(240, 240)));

        assert_eq!(app.face().weather_text(), Some("60°F Rain"));
        assert_eq!(app.face().battery_text(), Some("64%"));
        assert_eq!(app.face().time_text(), Some("10:07"));
    }

    fn with_temperature(value: TupleValue) -> Dictionary {
        let mut dict = weather(0, "Clear");
        dict.insert(KEY_TEMPERATURE, value).unwrap();
        dict
    }

    #[test]
    fn temperature_of_any_integer_width() {
        for (value, expected) in [
            (TupleValue::Uint8(72), "72°F Clear"),
            (TupleValue::Uint16(101), "101°F Clear"),
            (TupleValue::Uint32(88), "88°F Clear"),
            (TupleValue::Int8(-3), "-3°F Clear"),
            (TupleValue::Int16(-40), "-40°F Clear"),
        ] {
            let mut app = started(WatchFaceConfig::default());
            assert!(app.on_inbox_received(&with_temperature(value)));
            assert_eq!(app.face().weather_text(), Some(expected));
        }
    }

    #[test]
    fn unsigned_temperature_beyond_i32_is_ignored() {
        let mut app = started(WatchFaceConfig::default());
        let message = with_temperature(TupleValue::Uint32(i32::MAX as u32 + 1));
        assert!(!app.on_inbox_received(&message));
        assert_eq!(app.face().weather_text(), Some(WEATHER_PLACEHOLDER));
        assert_eq!(app.state().weather, None);
    }

    #[test]
    fn temperature_text_is_capped_at_seven_bytes() {
        let mut app = started(WatchFaceConfig::default());
        assert!(app.on_inbox_received(&with_temperature(TupleValue::Int32(i32::MIN))));
        assert_eq!(app.face().weather_text(), Some("-214748 Clear"));
    }
}
