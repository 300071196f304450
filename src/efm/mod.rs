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

//! Eight-to-fourteen modulation.
//!
//! An F3 frame occupies 588 channel bits: a 24-bit frame sync and 3 merging bits, followed by
//! 33 symbols of 14 channel bits, each followed by 3 merging bits. Symbol 0 carries the subcode
//! byte (or the S0/S1 subcode sync); symbols 1..33 carry the 32 F2 payload bytes.

pub mod delineator;
pub mod demodulator;
pub mod modulator;
pub mod table;

use bit_vec::BitVec;

/// The length of an F3 frame in channel bits.
pub const F3_FRAME_BITS: usize = 588;
/// The length of the frame sync pattern.
pub const SYNC_BITS: usize = 24;
/// The frame sync: a one, ten zeros, a one, ten zeros, a one, then a zero.
pub const SYNC_PATTERN: u32 = 0b1000_0000_0010_0000_0000_0010;
/// The number of symbols in an F3 frame, including the subcode symbol.
pub const F3_SYMBOLS: usize = 33;

/// Return the bit offset of symbol `index` within a frame.
#[inline]
pub const fn symbol_offset(index: usize) -> usize {
    SYNC_BITS + table::MERGE_BITS + index * (table::EFM_SYMBOL_BITS + table::MERGE_BITS)
}

/// The channel bits of one F3 frame, as produced by the delineator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelFrame {
    pub bits: BitVec,
    /// The frame sync was not found; the frame boundary was predicted from the cadence.
    pub sync_predicted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        assert_eq!(symbol_offset(0), 27);
        assert_eq!(symbol_offset(32) + table::EFM_SYMBOL_BITS + table::MERGE_BITS, F3_FRAME_BITS);
    }
}
