/*
    efmfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! The F1 byte scrambler.
//!
//! F1 bytes are XORed with a fixed 49-byte (392-bit) pattern, repeated over the byte stream.
//! The pattern is the first 392 output bits of the x^15 + x + 1 LFSR with the register preset
//! to 1, packed least significant bit first. Scrambling and descrambling are the same operation.

use crate::F1_FRAME_BYTES;

pub const SCRAMBLE_PATTERN_LEN: usize = 49;

pub const SCRAMBLE_PATTERN: [u8; SCRAMBLE_PATTERN_LEN] = scramble_pattern();

const fn scramble_pattern() -> [u8; SCRAMBLE_PATTERN_LEN] {
    let mut pattern = [0u8; SCRAMBLE_PATTERN_LEN];
    let mut reg: u16 = 1;
    let mut i = 0;
    while i < SCRAMBLE_PATTERN_LEN {
        let mut byte = 0u8;
        let mut bit = 0;
        while bit < 8 {
            byte |= ((reg & 1) as u8) << bit;
            let feedback = (reg ^ (reg >> 1)) & 1;
            reg = (reg >> 1) | (feedback << 14);
            bit += 1;
        }
        pattern[i] = byte;
        i += 1;
    }
    pattern
}

/// Applies the scramble pattern to successive F1 frames, tracking the pattern phase.
#[derive(Clone, Debug, Default)]
pub struct Scrambler {
    phase: usize,
}

impl Scrambler {
    pub fn new() -> Self {
        Self::default()
    }

    /// XOR one F1 frame with the pattern at the current phase and advance the phase.
    pub fn apply(&mut self, frame: &mut [u8; F1_FRAME_BYTES]) {
        for byte in frame.iter_mut() {
            *byte ^= SCRAMBLE_PATTERN[self.phase];
            self.phase = (self.phase + 1) % SCRAMBLE_PATTERN_LEN;
        }
    }

    /// Return the pattern offset that will be applied to the next byte.
    #[inline]
    pub fn phase(&self) -> usize {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0;
    }
}
