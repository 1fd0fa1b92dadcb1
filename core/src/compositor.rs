//! Turns decoded screen indices into plotted colours.

use embedded_graphics::{
    Pixel,
    pixelcolor::{Rgb888, RgbColor},
    prelude::{DrawTarget, Point},
};

use crate::palette::{GIGASCREEN_PALETTE, STANDARD_PALETTE, is_black_index, pack_rgb, unpack_rgb};
use crate::scr::{GIGASCREEN_SIZE, SCREEN_SIZE, Screen};

/// Non-bright channels are scaled by 666/1000 before blending.
const DIM_NUM: u32 = 666;
const DIM_DEN: u32 = 1000;

/// Which brightness flag dims each frame of a gigascreen pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendBrightness {
    /// Each frame is dimmed by its own flag.
    #[default]
    Independent,
    /// Frame 0's flag dims both frames, as older device firmware renders them.
    FirstFrame,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// One screen, direct palette lookup.
    #[default]
    Standard,
    /// Two screens back to back, averaged per pixel.
    Gigascreen(BlendBrightness),
}

impl RenderMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::Standard),
            "gigascreen" => Some(Self::Gigascreen(BlendBrightness::Independent)),
            "gigascreen-compat" => Some(Self::Gigascreen(BlendBrightness::FirstFrame)),
            _ => None,
        }
    }

    /// Value of the catalog's `zxPictureType` filter.
    pub fn picture_type(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Gigascreen(_) => "gigascreen",
        }
    }

    pub fn buffer_size(&self) -> usize {
        match self {
            Self::Standard => SCREEN_SIZE,
            Self::Gigascreen(_) => GIGASCREEN_SIZE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Top of ZXART.EE:",
            Self::Gigascreen(_) => "GigaScreens:",
        }
    }

    /// Plots `data` into `target` with the screen's top-left corner at
    /// `origin`. Black pixels are skipped so the background shows through.
    /// Returns the number of pixels plotted.
    pub fn render<D>(&self, data: &[u8], target: &mut D, origin: Point) -> Result<usize, D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let mut plotted = 0usize;
        let at = |x: usize, y: usize| origin + Point::new(x as i32, y as i32);
        match *self {
            Self::Standard => {
                let pixels = Screen::new(data, 0).pixels().filter_map(|p| {
                    direct_color(p.index).map(|color| Pixel(at(p.x, p.y), color))
                });
                target.draw_iter(pixels.inspect(|_| plotted += 1))?;
            }
            Self::Gigascreen(brightness) => {
                let frame0 = Screen::new(data, 0).pixels();
                let frame1 = Screen::second(data).pixels();
                let pixels = frame0.zip(frame1).filter_map(|(p0, p1)| {
                    let bright1 = match brightness {
                        BlendBrightness::Independent => p1.bright,
                        BlendBrightness::FirstFrame => p0.bright,
                    };
                    let packed = blend(
                        GIGASCREEN_PALETTE[p0.index as usize],
                        p0.bright,
                        GIGASCREEN_PALETTE[p1.index as usize],
                        bright1,
                    );
                    (packed != 0).then(|| Pixel(at(p0.x, p0.y), unpack_rgb(packed)))
                });
                target.draw_iter(pixels.inspect(|_| plotted += 1))?;
            }
        }
        Ok(plotted)
    }
}

/// Direct-mode colour of a palette index, `None` for the black variants.
pub fn direct_color(index: u8) -> Option<Rgb888> {
    if is_black_index(index) {
        return None;
    }
    STANDARD_PALETTE
        .get(index as usize)
        .map(|&packed| unpack_rgb(packed))
}

/// Channel scaled by 1000, dimmed unless bright.
fn adjust(channel: u8, bright: bool) -> u32 {
    if bright {
        channel as u32 * DIM_DEN
    } else {
        channel as u32 * DIM_NUM
    }
}

fn blend_channel(c0: u8, bright0: bool, c1: u8, bright1: bool) -> u8 {
    ((adjust(c0, bright0) + adjust(c1, bright1)) / (2 * DIM_DEN)) as u8
}

/// Averages two frame colours, truncating, and packs the result as
/// `0x00RRGGBB`.
pub fn blend(c0: Rgb888, bright0: bool, c1: Rgb888, bright1: bool) -> u32 {
    pack_rgb(Rgb888::new(
        blend_channel(c0.r(), bright0, c1.r(), bright1),
        blend_channel(c0.g(), bright0, c1.g(), bright1),
        blend_channel(c0.b(), bright0, c1.b(), bright1),
    ))
}
