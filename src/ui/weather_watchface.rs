//! Weather watchface

use embedded_graphics::{
    geometry::{Point, Size},
    pixelcolor::{Rgb565, RgbColor},
    prelude::*,
    primitives::Rectangle,
    text::Alignment,
};

use super::{ColorMode, FontId, TextLayer, WatchFace};
use crate::{
    config::{ScreenShape, WatchFaceConfig},
    fmt::{debug, warn},
};

/// Shown until the first weather message arrives
pub const WEATHER_PLACEHOLDER: &str = "Loading...";
/// Shown until the first battery reading
pub const BATTERY_PLACEHOLDER: &str = "??%";

const BACKGROUND_COLOR: ColorMode = Rgb565::WHITE;
const TIME_COLOR: ColorMode = Rgb565::RED;
// 0x555555
const DETAIL_COLOR: ColorMode = Rgb565::new(10, 21, 10);

/// Height the layout coordinates are designed for
const REFERENCE_HEIGHT: u32 = 168;

/// Vertical placement of the layers as (rectangular y, round y, height) in reference
/// coordinates
const TIME_ROW: (u32, u32, u32) = (52, 58, 50);
const WEATHER_ROW: (u32, u32, u32) = (100, 105, 25);
const BATTERY_ROW: (u32, u32, u32) = (130, 135, 10);

/// Positions of the layers for one screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub time: Rectangle,
    pub weather: Rectangle,
    pub battery: Rectangle,
}

impl Layout {
    /// Full width rows, placed for `shape` and scaled to the height of `bounds`.
    pub fn new(shape: ScreenShape, bounds: Size) -> Self {
        let row = |(rect_y, round_y, height): (u32, u32, u32)| {
            let y = match shape {
                ScreenShape::Rectangular => rect_y,
                ScreenShape::Round => round_y,
            };
            let scale = |v: u32| v * bounds.height / REFERENCE_HEIGHT;
            Rectangle::new(
                Point::new(0, scale(y) as i32),
                Size::new(bounds.width, scale(height).max(1)),
            )
        };

        Self {
            time: row(TIME_ROW),
            weather: row(WEATHER_ROW),
            battery: row(BATTERY_ROW),
        }
    }
}

struct Layers {
    time: TextLayer,
    weather: TextLayer,
    battery: Option<TextLayer>,
}

/// Time, weather and battery, stacked and centered.
pub struct WeatherWatchface {
    shape: ScreenShape,
    show_battery: bool,
    layers: Option<Layers>,
}

impl WeatherWatchface {
    pub fn new(config: &WatchFaceConfig) -> Self {
        Self {
            shape: config.shape,
            show_battery: config.show_battery,
            layers: None,
        }
    }

    /// Set the clock text. Returns `false` if the window is not loaded.
    pub fn set_time(&mut self, text: &str) -> bool {
        match &mut self.layers {
            Some(layers) => {
                layers.time.set_text(text);
                true
            }
            None => false,
        }
    }

    /// Set the weather text. Returns `false` if the window is not loaded.
    pub fn set_weather(&mut self, text: &str) -> bool {
        match &mut self.layers {
            Some(layers) => {
                layers.weather.set_text(text);
                true
            }
            None => false,
        }
    }

    /// Set the battery text. Returns `false` if the window is not loaded or the face
    /// has no battery layer.
    pub fn set_battery(&mut self, text: &str) -> bool {
        match self.layers.as_mut().and_then(|l| l.battery.as_mut()) {
            Some(battery) => {
                battery.set_text(text);
                true
            }
            None => false,
        }
    }

    pub fn time_text(&self) -> Option<&str> {
        self.layers.as_ref().map(|l| l.time.text())
    }

    pub fn weather_text(&self) -> Option<&str> {
        self.layers.as_ref().map(|l| l.weather.text())
    }

    pub fn battery_text(&self) -> Option<&str> {
        self.layers
            .as_ref()
            .and_then(|l| l.battery.as_ref())
            .map(|b| b.text())
    }
}

impl WatchFace for WeatherWatchface {
    fn load(&mut self, bounds: Size) {
        if self.layers.is_some() {
            warn!("Watchface already loaded");
            return;
        }
        let layout = Layout::new(self.shape, bounds);

        let time = TextLayer::new(layout.time, FontId::Time, TIME_COLOR)
            .with_alignment(Alignment::Center);

        let mut weather = TextLayer::new(layout.weather, FontId::Weather, DETAIL_COLOR)
            .with_alignment(Alignment::Center);
        weather.set_text(WEATHER_PLACEHOLDER);

        let battery = self.show_battery.then(|| {
            let mut battery = TextLayer::new(layout.battery, FontId::Battery, DETAIL_COLOR)
                .with_alignment(Alignment::Center);
            battery.set_text(BATTERY_PLACEHOLDER);
            battery
        });

        debug!("Watchface loaded ({}x{})", bounds.width, bounds.height);
        self.layers = Some(Layers {
            time,
            weather,
            battery,
        });
    }

    fn unload(&mut self) {
        if let Some(mut layers) = self.layers.take() {
            // Release in reverse order of creation
            drop(layers.battery.take());
            drop(layers.weather);
            drop(layers.time);
            debug!("Watchface unloaded");
        }
    }

    fn is_loaded(&self) -> bool {
        self.layers.is_some()
    }

    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = ColorMode>,
    {
        target.clear(BACKGROUND_COLOR)?;
        if let Some(layers) = &self.layers {
            layers.time.draw(target)?;
            layers.weather.draw(target)?;
            if let Some(battery) = &layers.battery {
                battery.draw(target)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::test_support::Frame;

    const PINETIME: Size = Size::new(240, 240);

    fn loaded(config: WatchFaceConfig) -> WeatherWatchface {
        let mut face = WeatherWatchface::new(&config);
        face.load(PINETIME);
        face
    }

    #[test]
    fn layout_matches_reference_on_reference_height() {
        let layout = Layout::new(ScreenShape::Rectangular, Size::new(144, 168));
        assert_eq!(layout.time, Rectangle::new(Point::new(0, 52), Size::new(144, 50)));
        assert_eq!(layout.weather, Rectangle::new(Point::new(0, 100), Size::new(144, 25)));
        assert_eq!(layout.battery, Rectangle::new(Point::new(0, 130), Size::new(144, 10)));

        let round = Layout::new(ScreenShape::Round, Size::new(180, 168));
        assert_eq!(round.time.top_left.y, 58);
        assert_eq!(round.weather.top_left.y, 105);
        assert_eq!(round.battery.top_left.y, 135);
    }

    #[test]
    fn layout_scales_to_screen() {
        let layout = Layout::new(ScreenShape::Rectangular, PINETIME);
        assert_eq!(layout.time.top_left.y, 52 * 240 / 168);
        assert_eq!(layout.weather.size, Size::new(240, 25 * 240 / 168));
        assert!(layout.battery.top_left.y + layout.battery.size.height as i32 <= 240);
    }

    #[test]
    fn load_sets_placeholders() {
        let face = loaded(WatchFaceConfig::default());
        assert!(face.is_loaded());
        assert_eq!(face.time_text(), Some(""));
        assert_eq!(face.weather_text(), Some(WEATHER_PLACEHOLDER));
        assert_eq!(face.battery_text(), Some(BATTERY_PLACEHOLDER));
    }

    #[test]
    fn face_without_battery_has_no_battery_layer() {
        let mut face = loaded(WatchFaceConfig::default().without_battery());
        assert_eq!(face.battery_text(), None);
        assert!(!face.set_battery("50%"));
    }

    #[test]
    fn setters_fail_after_unload() {
        let mut face = loaded(WatchFaceConfig::default());
        assert!(face.set_time("12:00"));
        face.unload();
        assert!(!face.is_loaded());
        assert!(!face.set_time("12:01"));
        assert!(!face.set_weather("72°F Cloudy"));
        assert!(!face.set_battery("80%"));
        assert_eq!(face.time_text(), None);
        // A second unload is harmless
        face.unload();
    }

    #[test]
    fn reload_starts_from_placeholders() {
        let mut face = loaded(WatchFaceConfig::default());
        face.set_weather("72°F Cloudy");
        face.unload();
        face.load(PINETIME);
        assert_eq!(face.weather_text(), Some(WEATHER_PLACEHOLDER));
    }

    #[test]
    fn double_load_keeps_existing_layers() {
        let mut face = loaded(WatchFaceConfig::default());
        face.set_time("09:15");
        face.load(PINETIME);
        assert_eq!(face.time_text(), Some("09:15"));
    }

    #[test]
    fn draw_renders_time_in_its_row() {
        let mut face = loaded(WatchFaceConfig::default());
        face.set_time("12:34");
        let layout = Layout::new(ScreenShape::Rectangular, PINETIME);

        let mut frame = Frame::new(240, 240);
        face.draw(&mut frame).unwrap();

        let top = layout.time.top_left.y as u32;
        let bottom = top + layout.time.size.height;
        assert!(frame.count_in_rows(TIME_COLOR, top, bottom) > 0);
        assert_eq!(frame.count_in_rows(TIME_COLOR, 0, top), 0);
        assert!(frame.count_in_rows(DETAIL_COLOR, bottom, 240) > 0);
    }

    #[test]
    fn unloaded_face_draws_background_only() {
        let face = WeatherWatchface::new(&WatchFaceConfig::default());
        let mut frame = Frame::new(240, 240);
        face.draw(&mut frame).unwrap();
        assert_eq!(frame.count_in_rows(BACKGROUND_COLOR, 0, 240), 240 * 240);
    }
}
