//! Text widget

use core::fmt::{self, Write};

use embedded_graphics::{
    geometry::Point,
    mono_font::{iso_8859_1::FONT_10X20, iso_8859_1::FONT_6X10, MonoFont, MonoTextStyle},
    prelude::*,
    primitives::Rectangle,
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use heapless::String;
use profont::PROFONT_24_POINT;

use super::ColorMode;

/// Longest text a layer holds, in bytes
pub const TEXT_CAPACITY: usize = 32;

/// Fonts bundled with the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontId {
    /// Large digits for the clock
    Time,
    /// Weather line
    Weather,
    /// Small battery indicator
    Battery,
}

impl FontId {
    pub fn font(self) -> &'static MonoFont<'static> {
        match self {
            FontId::Time => &PROFONT_24_POINT,
            FontId::Weather => &FONT_10X20,
            FontId::Battery => &FONT_6X10,
        }
    }
}

/// Rectangular region rendering one line of text.
#[derive(Clone, Debug)]
pub struct TextLayer {
    bounds: Rectangle,
    font: FontId,
    color: ColorMode,
    alignment: Alignment,
    text: String<TEXT_CAPACITY>,
}

impl TextLayer {
    /// Create an empty, left aligned layer.
    pub fn new(bounds: Rectangle, font: FontId, color: ColorMode) -> Self {
        Self {
            bounds,
            font,
            color,
            alignment: Alignment::Left,
            text: String::new(),
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Replace the text, cutting it at the last char that fits.
    pub fn set_text(&mut self, text: &str) {
        self.set_fmt(format_args!("{}", text));
    }

    /// Replace the text with formatted output, cutting it at the last char that fits.
    pub fn set_fmt(&mut self, args: fmt::Arguments) {
        self.text.clear();
        write_truncated(&mut self.text, args);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = ColorMode>,
    {
        let mut target = target.clipped(&self.bounds);

        let top = self.bounds.top_left.y;
        let anchor = match self.alignment {
            Alignment::Left => self.bounds.top_left,
            Alignment::Center => Point::new(self.bounds.center().x, top),
            Alignment::Right => Point::new(
                self.bounds.top_left.x + self.bounds.size.width as i32 - 1,
                top,
            ),
        };
        let character_style = MonoTextStyle::new(self.font.font(), self.color);
        let text_style = TextStyleBuilder::new()
            .alignment(self.alignment)
            .baseline(Baseline::Top)
            .build();

        Text::with_text_style(&self.text, anchor, character_style, text_style).draw(&mut target)?;
        Ok(())
    }
}

/// Append formatted output to `out`, dropping whatever does not fit. Strings are only
/// ever cut between chars. Returns whether anything was dropped.
pub fn write_truncated<const N: usize>(out: &mut String<N>, args: fmt::Arguments) -> bool {
    let mut writer = Truncating { out, full: false };
    // The writer never fails
    let _ = writer.write_fmt(args);
    writer.full
}

struct Truncating<'a, const N: usize> {
    out: &'a mut String<N>,
    full: bool,
}

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.full || self.out.push(c).is_err() {
                self.full = true;
                break;
            }
        }
        Ok(())
    }
}
