//! Decoder for the ZX Spectrum `.scr` screen layout.
//!
//! A screen is 6144 bytes of 1-bit bitmap followed by 768 attribute bytes,
//! one per 8x8 cell. Bitmap rows are interleaved in three 64-line thirds.
//! Reads past the end of a truncated buffer yield zero, so missing data
//! renders as paper instead of failing.

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 192;
pub const COLUMNS: usize = SCREEN_WIDTH / 8;
pub const BITMAP_SIZE: usize = 6144;
pub const ATTRIBUTE_SIZE: usize = 768;
/// Size of one complete screen; the second gigascreen frame starts here.
pub const SCREEN_SIZE: usize = BITMAP_SIZE + ATTRIBUTE_SIZE;
pub const GIGASCREEN_SIZE: usize = SCREEN_SIZE * 2;

/// Colour state of one 8x8 attribute cell, indices already shifted into
/// 8-15 when the cell is bright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedCell {
    pub ink: u8,
    pub paper: u8,
    pub bright: bool,
}

/// Byte offset of the bitmap byte holding pixels `column*8..column*8+8` of
/// row `y`.
pub fn pixel_offset(y: usize, column: usize) -> usize {
    let block = y / 64;
    let line = (y % 64) / 8;
    let row = y % 8;
    ((block * 8 + row) * 8 + line) * 32 + column
}

pub fn attr_offset(y: usize, column: usize) -> usize {
    BITMAP_SIZE + (y / 8) * COLUMNS + column
}

/// The flash bit (0x80) is ignored.
pub fn decode_attribute(attr: u8) -> DecodedCell {
    let ink = attr % 8;
    let paper = (attr / 8) % 8;
    let high = attr / 64;
    let bright = high == 1 || high == 3;
    if bright {
        DecodedCell {
            ink: ink + 8,
            paper: paper + 8,
            bright,
        }
    } else {
        DecodedCell { ink, paper, bright }
    }
}

/// One resolved screen pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrPixel {
    pub x: usize,
    pub y: usize,
    pub index: u8,
    pub bright: bool,
}

/// A view of one screen inside a raw buffer, starting `shift` bytes in.
#[derive(Clone, Copy)]
pub struct Screen<'a> {
    data: &'a [u8],
    shift: usize,
}

impl<'a> Screen<'a> {
    pub fn new(data: &'a [u8], shift: usize) -> Self {
        Self { data, shift }
    }

    /// Second frame of a gigascreen pair.
    pub fn second(data: &'a [u8]) -> Self {
        Self::new(data, SCREEN_SIZE)
    }

    fn byte(&self, offset: usize) -> u8 {
        self.data.get(self.shift + offset).copied().unwrap_or(0)
    }

    pub fn bits(&self, y: usize, column: usize) -> u8 {
        self.byte(pixel_offset(y, column))
    }

    pub fn cell(&self, y: usize, column: usize) -> DecodedCell {
        decode_attribute(self.byte(attr_offset(y, column)))
    }

    /// Palette index and brightness of the pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> (u8, bool) {
        let column = x / 8;
        let cell = self.cell(y, column);
        let mask = 0b1000_0000 >> (x % 8);
        if self.bits(y, column) & mask != 0 {
            (cell.ink, cell.bright)
        } else {
            (cell.paper, cell.bright)
        }
    }

    pub fn pixels(&self) -> Pixels<'a> {
        Pixels {
            screen: *self,
            y: 0,
            column: 0,
            bit: 0,
            bits: 0,
            cell: DecodedCell {
                ink: 0,
                paper: 0,
                bright: false,
            },
        }
    }
}

/// Row-major iterator over all 256x192 pixels of a screen. Bitmap and
/// attribute bytes are fetched once per 8-pixel group.
pub struct Pixels<'a> {
    screen: Screen<'a>,
    y: usize,
    column: usize,
    bit: usize,
    bits: u8,
    cell: DecodedCell,
}

impl Iterator for Pixels<'_> {
    type Item = ScrPixel;

    fn next(&mut self) -> Option<Self::Item> {
        if self.y >= SCREEN_HEIGHT {
            return None;
        }
        if self.bit == 0 {
            self.bits = self.screen.bits(self.y, self.column);
            self.cell = self.screen.cell(self.y, self.column);
        }
        let set = self.bits & (0b1000_0000 >> self.bit) != 0;
        let pixel = ScrPixel {
            x: self.column * 8 + self.bit,
            y: self.y,
            index: if set { self.cell.ink } else { self.cell.paper },
            bright: self.cell.bright,
        };

        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.column += 1;
            if self.column == COLUMNS {
                self.column = 0;
                self.y += 1;
            }
        }
        Some(pixel)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let done = (self.y * COLUMNS + self.column) * 8 + self.bit;
        let left = (SCREEN_WIDTH * SCREEN_HEIGHT).saturating_sub(done);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Pixels<'_> {}
