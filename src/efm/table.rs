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

//! The EFM code table.
//!
//! Each data byte maps to a 14-bit channel pattern in which every run of zeros between ones is
//! between 2 and 10 bits long. The inverse table covers all 16384 patterns and is built at
//! compile time; patterns outside the code decode to `None`.

/// The length of an EFM symbol in channel bits.
pub const EFM_SYMBOL_BITS: usize = 14;
/// The number of merging bits between symbols.
pub const MERGE_BITS: usize = 3;

/// The S0 subcode sync pattern, carried in the subcode position of the first frame of a block.
pub const SYNC_S0: u16 = 0b00100000000001;
/// The S1 subcode sync pattern, carried in the subcode position of the second frame of a block.
pub const SYNC_S1: u16 = 0b00000000010010;

#[rustfmt::skip]
pub const EFM_ENCODE: [u16; 256] = [
    0b01001000100000, 0b10000100000000, 0b10010000100000, 0b10001000100000,
    0b01000100000000, 0b00000100010000, 0b00010000100000, 0b00100100000000,
    0b01001001000000, 0b10000001000000, 0b10010001000000, 0b10001001000000,
    0b01000001000000, 0b00000001000000, 0b00010001000000, 0b00100001000000,
    0b10000000100000, 0b10000010000000, 0b10010010000000, 0b00100000100000,
    0b01000010000000, 0b00000010000000, 0b00010010000000, 0b00100010000000,
    0b01001000010000, 0b10000000010000, 0b10010000010000, 0b10001000010000,
    0b01000000010000, 0b00001000010000, 0b00010000010000, 0b00100000010000,
    0b00000000100000, 0b10000100001000, 0b00001000100000, 0b00100100100000,
    0b01000100001000, 0b00000100001000, 0b01000000100000, 0b00100100001000,
    0b01001001001000, 0b10000001001000, 0b10010001001000, 0b10001001001000,
    0b01000001001000, 0b00000001001000, 0b00010001001000, 0b00100001001000,
    0b00000100000000, 0b10000010001000, 0b10010010001000, 0b10000100010000,
    0b01000010001000, 0b00000010001000, 0b00010010001000, 0b00100010001000,
    0b01001000001000, 0b10000000001000, 0b10010000001000, 0b10001000001000,
    0b01000000001000, 0b00001000001000, 0b00010000001000, 0b00100000001000,
    0b01001000100100, 0b10000100100100, 0b10010000100100, 0b10001000100100,
    0b01000100100100, 0b00000000100100, 0b00010000100100, 0b00100100100100,
    0b01001001000100, 0b10000001000100, 0b10010001000100, 0b10001001000100,
    0b01000001000100, 0b00000001000100, 0b00010001000100, 0b00100001000100,
    0b10000000100100, 0b10000010000100, 0b10010010000100, 0b00100000100100,
    0b01000010000100, 0b00000010000100, 0b00010010000100, 0b00100010000100,
    0b01001000000100, 0b10000000000100, 0b10010000000100, 0b10001000000100,
    0b01000000000100, 0b00001000000100, 0b00010000000100, 0b00100000000100,
    0b01001000100010, 0b10000100100010, 0b10010000100010, 0b10001000100010,
    0b01000100100010, 0b00000000100010, 0b01000000100100, 0b00100100100010,
    0b01001001000010, 0b10000001000010, 0b10010001000010, 0b10001001000010,
    0b01000001000010, 0b00000001000010, 0b00010001000010, 0b00100001000010,
    0b10000000100010, 0b10000010000010, 0b10010010000010, 0b00100000100010,
    0b01000010000010, 0b00000010000010, 0b00010010000010, 0b00100010000010,
    0b01001000000010, 0b00001001001000, 0b10010000000010, 0b10001000000010,
    0b01000000000010, 0b00001000000010, 0b00010000000010, 0b00100000000010,
    0b01001000100001, 0b10000100100001, 0b10010000100001, 0b10001000100001,
    0b01000100100001, 0b00000000100001, 0b00010000100001, 0b00100100100001,
    0b01001001000001, 0b10000001000001, 0b10010001000001, 0b10001001000001,
    0b01000001000001, 0b00000001000001, 0b00010001000001, 0b00100001000001,
    0b10000000100001, 0b10000010000001, 0b10010010000001, 0b00100000100001,
    0b01000010000001, 0b00000010000001, 0b00010010000001, 0b00100010000001,
    0b01001000000001, 0b10000010010000, 0b10010000000001, 0b10001000000001,
    0b01000010010000, 0b00001000000001, 0b00010000000001, 0b00100010010000,
    0b00001000100001, 0b10000100001001, 0b01000100010000, 0b00000100100001,
    0b01000100001001, 0b00000100001001, 0b01000000100001, 0b00100100001001,
    0b01001001001001, 0b10000001001001, 0b10010001001001, 0b10001001001001,
    0b01000001001001, 0b00000001001001, 0b00010001001001, 0b00100001001001,
    0b00000100100000, 0b10000010001001, 0b10010010001001, 0b00100100010000,
    0b01000010001001, 0b00000010001001, 0b00010010001001, 0b00100010001001,
    0b01001000001001, 0b10000000001001, 0b10010000001001, 0b10001000001001,
    0b01000000001001, 0b00001000001001, 0b00010000001001, 0b00100000001001,
    0b01000100100000, 0b10000100010001, 0b10010010010000, 0b00001000100100,
    0b01000100010001, 0b00000100010001, 0b00010010010000, 0b00100100010001,
    0b00001001000001, 0b10000100000001, 0b00001001000100, 0b00001001000000,
    0b01000100000001, 0b00000100000001, 0b00000010010000, 0b00100100000001,
    0b00000100100100, 0b10000010010001, 0b10010010010001, 0b10000100100000,
    0b01000010010001, 0b00000010010001, 0b00010010010001, 0b00100010010001,
    0b01001000010001, 0b10000000010001, 0b10010000010001, 0b10001000010001,
    0b01000000010001, 0b00001000010001, 0b00010000010001, 0b00100000010001,
    0b01000100000010, 0b00000100000010, 0b10000100010010, 0b00100100000010,
    0b01000100010010, 0b00000100010010, 0b01000000100010, 0b00100100010010,
    0b10000100000010, 0b10000100000100, 0b00001001001001, 0b00001001000010,
    0b01000100000100, 0b00000100000100, 0b00010000100010, 0b00100100000100,
    0b00000100100010, 0b10000010010010, 0b10010010010010, 0b00001000100010,
    0b01000010010010, 0b00000010010010, 0b00010010010010, 0b00100010010010,
    0b01001000010010, 0b10000000010010, 0b10010000010010, 0b10001000010010,
    0b01000000010010, 0b00001000010010, 0b00010000010010, 0b00100000010010,
];

pub static EFM_DECODE: [Option<u8>; 1 << EFM_SYMBOL_BITS] = build_decode_table();

const fn build_decode_table() -> [Option<u8>; 1 << EFM_SYMBOL_BITS] {
    let mut table = [None; 1 << EFM_SYMBOL_BITS];
    let mut i = 0;
    while i < 256 {
        table[EFM_ENCODE[i] as usize] = Some(i as u8);
        i += 1;
    }
    table
}

/// Decode a 14-bit channel pattern into a data byte.
#[inline]
pub fn efm_decode(pattern: u16) -> Option<u8> {
    EFM_DECODE[(pattern as usize) & ((1 << EFM_SYMBOL_BITS) - 1)]
}

/// Encode a data byte into its 14-bit channel pattern.
#[inline]
pub fn efm_encode(byte: u8) -> u16 {
    EFM_ENCODE[byte as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_runs_valid(pattern: u16) -> bool {
        // Runs strictly between two ones must be 2..=10 zeros long.
        let ones: Vec<usize> = (0..EFM_SYMBOL_BITS).filter(|&i| pattern & (1 << i) != 0).collect();
        ones.windows(2).all(|w| (2..=10).contains(&(w[1] - w[0] - 1)))
    }

    #[test]
    fn test_table_inverse() {
        for byte in 0..=255u8 {
            assert_eq!(efm_decode(efm_encode(byte)), Some(byte));
        }
        let valid = EFM_DECODE.iter().filter(|e| e.is_some()).count();
        assert_eq!(valid, 256);
    }

    #[test]
    fn test_run_lengths() {
        for &pattern in EFM_ENCODE.iter() {
            assert!(zero_runs_valid(pattern), "{:014b}", pattern);
        }
    }

    #[test]
    fn test_sync_patterns_not_data() {
        assert_eq!(efm_decode(SYNC_S0), None);
        assert_eq!(efm_decode(SYNC_S1), None);
        assert_eq!(efm_decode(0), None);
    }

    #[test]
    fn test_known_symbols() {
        assert_eq!(efm_encode(0x00), 0b01001000100000);
        assert_eq!(efm_encode(0x01), 0b10000100000000);
    }
}
