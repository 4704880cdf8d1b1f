//! Converts a raw screen dump into a viewable picture.
//!
//! The scope scans its panel in vertical strips: every 128 consecutive bytes
//! of the dump are one strip, packed two 4-bit color indices per byte, and
//! the strips run right to left. The panel is addressed as 320x256 even
//! though only 320x240 is visible, so the last 8 bytes of every strip cover
//! rows that never appear on screen.

use crate::frame::{RawFrame, Image};
use crate::frame::{IMAGE_WIDTH, STRIP_PITCH, STRIP_VISIBLE};
use crate::palette::Theme;

/// Unpacks `frame` into `image`, coloring every pixel through `theme`.
///
/// Each visible input byte paints two vertically adjacent pixels: the high
/// nibble the upper one, the low nibble the lower one. Padding bytes paint
/// nothing. Pure and infallible; both buffer sizes are fixed by their types.
pub fn unpack(frame: &RawFrame, theme: &Theme, image: &mut Image) {
    let pixels = image.pixels_mut();
    for (offset, &byte) in frame.as_bytes().iter().enumerate() {
        let strip_pos = offset % STRIP_PITCH;
        if strip_pos >= STRIP_VISIBLE {
            continue; // padding for the unused bottom of the panel
        }
        // undo the right-to-left strip order and the 90 degree rotation
        let column = (IMAGE_WIDTH - 1) - offset / STRIP_PITCH;
        let row = strip_pos * 2;
        pixels[row * IMAGE_WIDTH + column] = theme.color(byte >> 4);
        pixels[(row + 1) * IMAGE_WIDTH + column] = theme.color(byte & 0xf);
    }
}
