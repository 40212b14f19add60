// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! 5x7 column font and scrolling frames for the 8x8 matrix

use super::{Rgb, OFF};

/// Side length of the LED matrix
pub const MATRIX_SIZE: usize = 8;

/// One matrix image, indexed `[row][column]`
pub type Frame = [[Rgb; MATRIX_SIZE]; MATRIX_SIZE];

/// Column bitmaps, bit 0 is the top row
fn glyph(c: char) -> [u8; 5] {
    match c {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00],
        '%' => [0x23, 0x13, 0x08, 0x64, 0x62],
        '\'' => [0x00, 0x05, 0x03, 0x00, 0x00],
        '-' => [0x08, 0x08, 0x08, 0x08, 0x08],
        '.' => [0x00, 0x60, 0x60, 0x00, 0x00],
        ':' => [0x00, 0x36, 0x36, 0x00, 0x00],
        '0' => [0x3E, 0x51, 0x49, 0x45, 0x3E],
        '1' => [0x00, 0x42, 0x7F, 0x40, 0x00],
        '2' => [0x42, 0x61, 0x51, 0x49, 0x46],
        '3' => [0x21, 0x41, 0x45, 0x4B, 0x31],
        '4' => [0x18, 0x14, 0x12, 0x7F, 0x10],
        '5' => [0x27, 0x45, 0x45, 0x45, 0x39],
        '6' => [0x3C, 0x4A, 0x49, 0x49, 0x30],
        '7' => [0x01, 0x71, 0x09, 0x05, 0x03],
        '8' => [0x36, 0x49, 0x49, 0x49, 0x36],
        '9' => [0x06, 0x49, 0x49, 0x29, 0x1E],
        'C' => [0x3E, 0x41, 0x41, 0x41, 0x22],
        'H' => [0x7F, 0x08, 0x08, 0x08, 0x7F],
        'T' => [0x01, 0x01, 0x7F, 0x01, 0x01],
        'a' => [0x20, 0x54, 0x54, 0x54, 0x78],
        'b' => [0x7F, 0x48, 0x44, 0x44, 0x38],
        'p' => [0x7C, 0x14, 0x14, 0x14, 0x08],
        'r' => [0x7C, 0x08, 0x04, 0x04, 0x08],
        _ => [0x02, 0x01, 0x51, 0x09, 0x06],
    }
}

/// Pixel columns for `text` with a blank matrix width on both ends
pub fn render_strip(text: &str) -> Vec<u8> {
    let mut strip = vec![0u8; MATRIX_SIZE];
    for c in text.chars() {
        strip.extend_from_slice(&glyph(c));
        strip.push(0);
    }
    strip.extend(std::iter::repeat(0).take(MATRIX_SIZE));
    strip
}

/// Frames of a message scrolling right to left, one column per step
pub struct Scroller {
    strip: Vec<u8>,
    colour: Rgb,
    offset: usize,
}

impl Scroller {
    /// Frames of `text` drawn in `colour`
    pub fn new(text: &str, colour: Rgb) -> Self {
        Self {
            strip: render_strip(text),
            colour,
            offset: 0,
        }
    }

    /// Total number of frames the message takes
    pub fn frame_count(&self) -> usize {
        self.strip.len() + 1 - MATRIX_SIZE
    }
}

impl Iterator for Scroller {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.offset + MATRIX_SIZE > self.strip.len() {
            return None;
        }
        let mut frame = [[OFF; MATRIX_SIZE]; MATRIX_SIZE];
        for (x, bits) in self.strip[self.offset..self.offset + MATRIX_SIZE].iter().enumerate() {
            for (y, row) in frame.iter_mut().enumerate() {
                if bits & (1 << y) != 0 {
                    row[x] = self.colour;
                }
            }
        }
        self.offset += 1;
        Some(frame)
    }
}
