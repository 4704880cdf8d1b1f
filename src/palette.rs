//! The 16-entry indexed color the scope's raster uses, and the built-in
//! looks that can be applied to it.

use std::sync::atomic::{AtomicUsize, Ordering};

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color { r, g, b }
}

/// A lookup table mapping the scope's 4-bit pixel indices to RGB. The entry
/// order is fixed by the instrument's firmware; every theme recolors the same
/// sixteen roles.
pub struct Theme {
    pub name: &'static str,
    colors: [Color; 16],
}

impl Theme {
    pub fn color(&self, index: u8) -> Color {
        self.colors[usize::from(index & 0xf)]
    }

    /// Looks up a built-in theme by name.
    pub fn find(name: &str) -> Option<&'static Theme> {
        THEMES.iter().copied().find(|theme| theme.name == name)
    }
}

/// Colors as the instrument's own LCD shows them.
pub static DEVICE: Theme = Theme {
    name: "device",
    colors: [
        rgb(0x00, 0x00, 0x00), // menu text
        rgb(0x00, 0x00, 0x00), // trace background
        rgb(0xff, 0xff, 0x00), // channel-1 trace/info
        rgb(0x80, 0x80, 0x80), // unknown
        rgb(0x00, 0xff, 0xff), // channel-2 trace/info
        rgb(0x80, 0x80, 0x80), // unknown
        rgb(0x66, 0xff, 0x66), // horizontal/trigger info, markers
        rgb(0xff, 0xff, 0xff), // GUI text and borders
        rgb(0x88, 0x88, 0x88), // trace reticle, menu shadow
        rgb(0x80, 0x80, 0x80), // unknown
        rgb(0x00, 0x00, 0x55), // GUI background
        rgb(0xbb, 0xbb, 0xbb), // menu background
        rgb(0x80, 0x80, 0x80), // unknown
        rgb(0x80, 0x80, 0x80), // unknown
        rgb(0xff, 0x22, 0x22), // math trace/info, logo background
        rgb(0xff, 0xff, 0xff), // menu highlight
    ],
};

/// Light colors for a white background.
pub static LIGHT: Theme = Theme {
    name: "light",
    colors: [
        rgb(0x55, 0x56, 0x50), // menu text
        rgb(0xf9, 0xf8, 0xf5), // trace background
        rgb(0xf9, 0x26, 0x72), // channel-1 trace/info
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0x46, 0xa9, 0xdf), // channel-2 trace/info
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0x86, 0xd2, 0x1e), // horizontal/trigger info, markers
        rgb(0x55, 0x56, 0x50), // GUI text and borders
        rgb(0xa5, 0xa1, 0xae), // trace reticle, menu shadow
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0xf8, 0xf8, 0xf2), // GUI background
        rgb(0xf8, 0xf8, 0xf2), // menu background
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0xf4, 0xbf, 0x35), // math trace/info, logo background
        rgb(0xf9, 0xf8, 0xf5), // menu highlight
    ],
};

/// Darker colors, after gruvbox (github.com/morhetz/gruvbox-generalized).
pub static DARK: Theme = Theme {
    name: "dark",
    colors: [
        rgb(0x1d, 0x1c, 0x1a), // menu text
        rgb(0x1d, 0x1c, 0x1a), // trace background
        rgb(0xd7, 0x99, 0x21), // channel-1 trace/info
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0x45, 0x85, 0x88), // channel-2 trace/info
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0xb8, 0xbb, 0x26), // horizontal/trigger info, markers
        rgb(0xa8, 0x99, 0x84), // GUI text and borders
        rgb(0x92, 0x83, 0x74), // trace reticle, menu shadow
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0x32, 0x30, 0x2f), // GUI background
        rgb(0xa8, 0x99, 0x84), // menu background
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0x80, 0x00, 0x80), // unknown
        rgb(0xfb, 0x49, 0x34), // math trace/info, logo background
        rgb(0xeb, 0xdb, 0xb2), // menu highlight
    ],
};

/// Black and white, for printing.
pub static MONO: Theme = Theme {
    name: "mono",
    colors: [
        rgb(0x00, 0x00, 0x00), // menu text
        rgb(0xff, 0xff, 0xff), // trace background
        rgb(0x00, 0x00, 0x00), // channel-1 trace/info
        rgb(0xff, 0xff, 0xff), // unknown
        rgb(0x00, 0x00, 0x00), // channel-2 trace/info
        rgb(0xff, 0xff, 0xff), // unknown
        rgb(0x00, 0x00, 0x00), // horizontal/trigger info, markers
        rgb(0x00, 0x00, 0x00), // GUI text and borders
        rgb(0x00, 0x00, 0x00), // trace reticle, menu shadow
        rgb(0xff, 0xff, 0xff), // unknown
        rgb(0xff, 0xff, 0xff), // GUI background
        rgb(0xff, 0xff, 0xff), // menu background
        rgb(0xff, 0xff, 0xff), // unknown
        rgb(0xff, 0xff, 0xff), // unknown
        rgb(0x00, 0x00, 0x00), // math trace/info, logo background
        rgb(0xff, 0xff, 0xff), // menu highlight
    ],
};

/// The rotation the viewer cycles through.
pub static THEMES: [&Theme; 4] = [&DEVICE, &LIGHT, &DARK, &MONO];

/// Process-wide theme selection. The current theme is read on every decode,
/// but the index only ever changes from the input-event path, so relaxed
/// atomics are enough.
pub struct Palette {
    index: AtomicUsize,
}

impl Palette {
    pub const fn new() -> Palette {
        Palette { index: AtomicUsize::new(0) }
    }

    pub fn current(&self) -> &'static Theme {
        THEMES[self.index.load(Ordering::Relaxed)]
    }

    /// Steps to the next theme, wrapping after the last, and returns the new
    /// selection.
    pub fn advance(&self) -> &'static Theme {
        let next = (self.index.load(Ordering::Relaxed) + 1) % THEMES.len();
        self.index.store(next, Ordering::Relaxed);
        THEMES[next]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_advance_wraps_to_the_start() {
        let palette = Palette::new();
        let start = palette.current().name;
        for _ in 0..THEMES.len() {
            palette.advance();
        }
        assert_eq!(palette.current().name, start);
    }

    #[test]
    fn test_advance_visits_every_theme() {
        let palette = Palette::new();
        let mut seen = vec![palette.current().name];
        for _ in 1..THEMES.len() {
            seen.push(palette.advance().name);
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), THEMES.len());
    }

    #[test]
    fn test_find_resolves_every_builtin() {
        for &theme in THEMES.iter() {
            assert!(std::ptr::eq(Theme::find(theme.name).unwrap(), theme));
        }
        assert!(Theme::find("sepia").is_none());
    }

    #[test]
    fn test_color_masks_to_a_nibble() {
        assert_eq!(DEVICE.color(0xf2), DEVICE.color(0x02));
        assert_eq!(DEVICE.color(0x1f), DEVICE.color(0x0f));
    }
}
