use std::path::Path;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{Point, RgbColor};
use image::{Rgb, RgbImage};
use log::info;
use zxart_core::compositor::RenderMode;
use zxart_core::framebuffer::FrameBuffer;
use zxart_core::scr::{SCREEN_HEIGHT, SCREEN_WIDTH};

use crate::DesktopError;

/// Composites a screen dump into a 256×192 image without touching the network.
pub fn render_screen(data: &[u8], mode: RenderMode) -> RgbImage {
    let mut fb = FrameBuffer::new();
    let Ok(_) = mode.render(data, &mut fb, Point::zero());
    RgbImage::from_fn(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, |x, y| {
        let color = fb.pixel(x as i32, y as i32).unwrap_or(Rgb888::BLACK);
        Rgb([color.r(), color.g(), color.b()])
    })
}

pub fn render_file(input: &Path, output: &Path, mode: RenderMode) -> Result<(), DesktopError> {
    let data = std::fs::read(input)?;
    if data.len() < mode.buffer_size() {
        info!(
            "render: {} has {} of {} bytes, padding with zeros",
            input.display(),
            data.len(),
            mode.buffer_size()
        );
    }
    render_screen(&data, mode).save(output)?;
    info!("render: wrote {}", output.display());
    Ok(())
}
