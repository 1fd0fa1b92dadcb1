extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use embedded_graphics::{
    Pixel,
    pixelcolor::Rgb888,
    prelude::{DrawTarget, OriginDimensions, Size},
};

use crate::palette::{pack_rgb, unpack_rgb};

pub const WIDTH: usize = 320;
pub const HEIGHT: usize = 240;
pub const BUFFER_SIZE: usize = WIDTH * HEIGHT;

/// 24-bit colour framebuffer, one packed `0x00RRGGBB` word per pixel.
pub struct FrameBuffer {
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; BUFFER_SIZE],
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn clear_screen(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb888> {
        if x < 0 || y < 0 || x as usize >= WIDTH || y as usize >= HEIGHT {
            return None;
        }
        Some(unpack_rgb(self.pixels[y as usize * WIDTH + x as usize]))
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb888) {
        if x < 0 || y < 0 || x as usize >= WIDTH || y as usize >= HEIGHT {
            return;
        }
        self.pixels[y as usize * WIDTH + x as usize] = pack_rgb(color);
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            self.set_pixel(coord.x, coord.y, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_screen(pack_rgb(color));
        Ok(())
    }
}
