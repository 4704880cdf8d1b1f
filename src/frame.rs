use crate::palette::Color;

/// Size of one complete screen dump as sent by the scope.
pub const FRAME_SIZE: usize = 40_960;
/// Bytes per vertical strip of the dump; one strip becomes one image column.
pub const STRIP_PITCH: usize = 128;
/// Leading bytes of each strip that carry visible pixels; the rest is padding
/// for the unused bottom of the nominal 320x256 panel.
pub const STRIP_VISIBLE: usize = 120;

pub const IMAGE_WIDTH: usize = 320;
pub const IMAGE_HEIGHT: usize = 240;

/// One screen dump, exactly as it came off the wire. Only a completely
/// filled frame is ever handed out by the acquisition path.
pub struct RawFrame {
    data: Box<[u8; FRAME_SIZE]>,
}

impl RawFrame {
    pub fn new() -> RawFrame {
        RawFrame { data: bytemuck::zeroed_box() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// The decoded 320x240 picture, 3 bytes per pixel, row-major from the top.
#[derive(Debug)]
pub struct Image {
    data: Box<[u8; IMAGE_WIDTH * IMAGE_HEIGHT * 3]>,
}

impl Image {
    pub fn new() -> Image {
        Image { data: bytemuck::zeroed_box() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    pub fn pixels(&self) -> &[Color] {
        bytemuck::cast_slice(&self.data[..])
    }

    pub fn pixels_mut(&mut self) -> &mut [Color] {
        bytemuck::cast_slice_mut(&mut self.data[..])
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_frame_starts_zeroed() {
        let frame = RawFrame::new();
        assert_eq!(frame.as_bytes().len(), FRAME_SIZE);
        assert!(frame.as_bytes().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn test_strip_geometry_covers_the_image() {
        assert_eq!(FRAME_SIZE / STRIP_PITCH, IMAGE_WIDTH);
        assert_eq!(STRIP_VISIBLE * 2, IMAGE_HEIGHT);
    }

    #[test]
    fn test_image_pixel_views_alias_the_bytes() {
        let mut image = Image::new();
        assert_eq!(image.pixels().len(), IMAGE_WIDTH * IMAGE_HEIGHT);
        image.pixels_mut()[IMAGE_WIDTH + 2] = Color { r: 1, g: 2, b: 3 };
        let offset = (IMAGE_WIDTH + 2) * 3;
        assert_eq!(&image.as_bytes()[offset..offset + 3], &[1, 2, 3]);
    }
}
