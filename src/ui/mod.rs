//! UI definitions module
//! Based on: https://github.com/lupyuen/pinetime-watchface/blob/master/src/lib.rs

use embedded_graphics::{draw_target::DrawTarget, geometry::Size, pixelcolor::Rgb565};

mod text_layer;
mod weather_watchface;

pub use text_layer::{write_truncated, FontId, TextLayer, TEXT_CAPACITY};
pub use weather_watchface::{Layout, WeatherWatchface, BATTERY_PLACEHOLDER, WEATHER_PLACEHOLDER};

/// Pixel format of the LCD
pub type ColorMode = Rgb565;

/// A watchface owns its widgets only while its window is visible.
pub trait WatchFace {
    /// Create the widgets for a window of the given size. No-op when already loaded.
    fn load(&mut self, bounds: Size);

    /// Release all widgets. No-op when not loaded.
    fn unload(&mut self);

    /// Whether the widgets currently exist
    fn is_loaded(&self) -> bool;

    /// Render the window
    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = ColorMode>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use core::convert::Infallible;

    use embedded_graphics::{
        geometry::{OriginDimensions, Point, Size},
        pixelcolor::RgbColor,
        Pixel,
    };

    use super::*;

    /// In-memory display
    pub struct Frame {
        size: Size,
        pixels: Vec<ColorMode>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                size: Size::new(width, height),
                pixels: vec![ColorMode::BLACK; (width * height) as usize],
            }
        }

        pub fn pixel(&self, x: u32, y: u32) -> ColorMode {
            self.pixels[(y * self.size.width + x) as usize]
        }

        /// Number of pixels of `color` inside the rows `top..bottom`
        pub fn count_in_rows(&self, color: ColorMode, top: u32, bottom: u32) -> usize {
            (top..bottom.min(self.size.height))
                .flat_map(|y| (0..self.size.width).map(move |x| (x, y)))
                .filter(|&(x, y)| self.pixel(x, y) == color)
                .count()
        }
    }

    impl OriginDimensions for Frame {
        fn size(&self) -> Size {
            self.size
        }
    }

    impl DrawTarget for Frame {
        type Color = ColorMode;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(Point { x, y }, color) in pixels {
                if x >= 0 && y >= 0 && (x as u32) < self.size.width && (y as u32) < self.size.height {
                    let index = y as u32 * self.size.width + x as u32;
                    self.pixels[index as usize] = color;
                }
            }
            Ok(())
        }
    }
}
