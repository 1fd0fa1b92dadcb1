//! "Pulsar" colour scheme for the sixteen ZX Spectrum colours.
//!
//! Indices 0-7 are the normal colours, 8-15 their bright variants. Both
//! tables describe the same scheme: one as packed words for direct
//! rendering, one as channel triples for gigascreen blending.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

pub const PALETTE_LEN: usize = 16;

pub const STANDARD_PALETTE: [u32; PALETTE_LEN] = [
    0x000000, 0x0000CD, 0xCD0000, 0xCD00CD, 0x00CD00, 0x00CDCD, 0xCDCD00, 0xCDCDCD,
    0x000000, 0x0000FF, 0xFF0000, 0xFF00FF, 0x00FF00, 0x00FFFF, 0xFFFF00, 0xFFFFFF,
];

pub const GIGASCREEN_PALETTE: [Rgb888; PALETTE_LEN] = [
    Rgb888::new(0, 0, 0),
    Rgb888::new(0, 0, 205),
    Rgb888::new(205, 0, 0),
    Rgb888::new(205, 0, 205),
    Rgb888::new(0, 205, 0),
    Rgb888::new(0, 205, 205),
    Rgb888::new(205, 205, 0),
    Rgb888::new(205, 205, 205),
    Rgb888::new(0, 0, 0),
    Rgb888::new(0, 0, 255),
    Rgb888::new(255, 0, 0),
    Rgb888::new(255, 0, 255),
    Rgb888::new(0, 255, 0),
    Rgb888::new(0, 255, 255),
    Rgb888::new(255, 255, 0),
    Rgb888::new(255, 255, 255),
];

/// Both black variants. Pixels resolving to these are left unplotted.
pub fn is_black_index(index: u8) -> bool {
    index == 0 || index == 8
}

pub fn pack_rgb(color: Rgb888) -> u32 {
    ((color.r() as u32) << 16) | ((color.g() as u32) << 8) | color.b() as u32
}

pub fn unpack_rgb(value: u32) -> Rgb888 {
    Rgb888::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palettes_describe_the_same_colours() {
        for (packed, rgb) in STANDARD_PALETTE.iter().zip(GIGASCREEN_PALETTE.iter()) {
            assert_eq!(*packed, pack_rgb(*rgb));
        }
    }

    #[test]
    fn bright_variants_are_at_least_as_bright() {
        for i in 0..8 {
            let normal = GIGASCREEN_PALETTE[i];
            let bright = GIGASCREEN_PALETTE[i + 8];
            assert!(bright.r() >= normal.r());
            assert!(bright.g() >= normal.g());
            assert!(bright.b() >= normal.b());
        }
    }

    #[test]
    fn only_the_black_indices_are_transparent() {
        let black: [u8; 2] = [0, 8];
        for index in 0..PALETTE_LEN as u8 {
            assert_eq!(is_black_index(index), black.contains(&index));
        }
    }
}
