use embedded_graphics::prelude::Point;

use crate::framebuffer::FrameBuffer;

pub use crate::framebuffer::{HEIGHT, WIDTH};

/// Top-left corner of the 256x192 screen, centred on the 320x240 panel.
pub const SCREEN_ORIGIN: Point = Point::new(32, 24);
pub const TITLE_POS: Point = Point::new(0, 0);
pub const FOOTER_POS: Point = Point::new(0, 224);
pub const STATUS_POS: Point = Point::new(24, 224);

pub trait Display {
    /// Shows the framebuffer contents on the panel.
    fn display(&mut self, buffers: &FrameBuffer);
}
