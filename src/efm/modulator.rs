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

//! The EFM modulator turns F3 frames into a channel-bit stream.
//!
//! Three merging bits are placed before every pattern. They are chosen from `000`, `100`, `010`
//! and `001` so that every zero run crossing the junction stays within 2..=10 bits, the junction
//! never forms a sync-like pair of 10-zero runs, and, among the candidates that remain, the
//! running digital sum value of the NRZI waveform stays closest to zero.

use crate::{
    efm::{
        table::{efm_encode, EFM_SYMBOL_BITS, MERGE_BITS, SYNC_S0, SYNC_S1},
        SYNC_BITS,
        SYNC_PATTERN,
    },
    types::{enums::SyncHeader, frames::F3Frame},
};
use bit_vec::BitVec;

const MERGE_CANDIDATES: [u64; 4] = [0b000, 0b100, 0b010, 0b001];
const TAIL_BITS: usize = SYNC_BITS;
/// A one, ten zeros, a one, ten zeros, a one: the part of the sync no data may imitate.
const DOUBLE_RUN: u64 = (1 << 22) | (1 << 11) | 1;
const DOUBLE_RUN_BITS: usize = 23;
const MIN_RUN: usize = 2;
const MAX_RUN: usize = 10;

#[inline]
fn bit_at(window: u64, len: usize, i: usize) -> bool {
    (window >> (len - 1 - i)) & 1 != 0
}

/// Check the zero runs of `window` that end inside its new part (from `new_start`).
fn runs_ok(window: u64, len: usize, new_start: usize) -> bool {
    let mut last_one: Option<usize> = None;
    for i in 0..len {
        if bit_at(window, len, i) {
            if let Some(prev) = last_one {
                let run = i - prev - 1;
                if i >= new_start && !(MIN_RUN..=MAX_RUN).contains(&run) {
                    return false;
                }
            }
            last_one = Some(i);
        }
    }
    match last_one {
        Some(last) => len - 1 - last <= MAX_RUN,
        None => false,
    }
}

/// Count occurrences of the double 10-zero run that include at least one new bit.
fn count_double_runs(window: u64, len: usize, new_start: usize) -> usize {
    let mask = (1u64 << DOUBLE_RUN_BITS) - 1;
    (new_start.max(DOUBLE_RUN_BITS - 1)..len)
        .filter(|&end| (window >> (len - 1 - end)) & mask == DOUBLE_RUN)
        .count()
}

#[derive(Clone, Debug, Default)]
pub struct EfmModulator {
    bits:     BitVec,
    tail:     u64,
    tail_len: usize,
    level:    bool,
    dsv:      i64,
}

impl EfmModulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one F3 frame: the frame sync, the subcode symbol and 32 payload symbols.
    pub fn push_frame(&mut self, frame: &F3Frame) {
        self.push_pattern(SYNC_PATTERN as u64, SYNC_BITS, true);
        let subcode = match frame.header {
            SyncHeader::Sync0 => SYNC_S0,
            SyncHeader::Sync1 => SYNC_S1,
            SyncHeader::None => efm_encode(frame.subcode),
        };
        self.push_pattern(subcode as u64, EFM_SYMBOL_BITS, false);
        for &byte in frame.payload.iter() {
            self.push_pattern(efm_encode(byte) as u64, EFM_SYMBOL_BITS, false);
        }
    }

    /// Append the merging bits that close the final frame, as if another sync followed.
    pub fn finish(&mut self) {
        if self.bits.is_empty() {
            return;
        }
        let merge = self.choose_merge(SYNC_PATTERN as u64, SYNC_BITS, true);
        self.append(merge, MERGE_BITS);
    }

    /// Return the channel bits produced so far.
    pub fn bits(&self) -> &BitVec {
        &self.bits
    }

    /// Return the channel bits packed MSB-first. The final byte is zero-padded.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.to_bytes()
    }

    /// Return the current digital sum value.
    pub fn dsv(&self) -> i64 {
        self.dsv
    }

    fn push_pattern(&mut self, pattern: u64, len: usize, is_sync: bool) {
        if !self.bits.is_empty() {
            let merge = self.choose_merge(pattern, len, is_sync);
            self.append(merge, MERGE_BITS);
        }
        self.append(pattern, len);
    }

    fn choose_merge(&self, pattern: u64, len: usize, is_sync: bool) -> u64 {
        let expected_runs = if is_sync { 1 } else { 0 };
        let new_len = MERGE_BITS + len;
        let window_len = self.tail_len + new_len;

        let mut best: Option<(i64, u64)> = None;
        for &merge in MERGE_CANDIDATES.iter() {
            let new_bits = (merge << len) | pattern;
            let window = (self.tail << new_len) | new_bits;
            if !runs_ok(window, window_len, self.tail_len) {
                continue;
            }
            if count_double_runs(window, window_len, self.tail_len) != expected_runs {
                continue;
            }
            let dsv = self.dsv_after(new_bits, new_len).abs();
            if best.map_or(true, |(best_dsv, _)| dsv < best_dsv) {
                best = Some((dsv, merge));
            }
        }

        match best {
            Some((_, merge)) => merge,
            None => {
                log::trace!("EfmModulator: no merging bits satisfy the run-length limits");
                0
            }
        }
    }

    fn dsv_after(&self, bits: u64, len: usize) -> i64 {
        let mut level = self.level;
        let mut dsv = self.dsv;
        for i in 0..len {
            if bit_at(bits, len, i) {
                level = !level;
            }
            dsv += if level { 1 } else { -1 };
        }
        dsv
    }

    fn append(&mut self, bits: u64, len: usize) {
        for i in 0..len {
            let bit = bit_at(bits, len, i);
            self.bits.push(bit);
            if bit {
                self.level = !self.level;
            }
            self.dsv += if self.level { 1 } else { -1 };
        }
        self.tail = ((self.tail << len) | bits) & ((1 << TAIL_BITS) - 1);
        self.tail_len = (self.tail_len + len).min(TAIL_BITS);
    }
}
