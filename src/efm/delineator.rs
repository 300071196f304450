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

//! The bit delineator groups a raw channel-bit stream into 588-bit F3 frames.
//!
//! The delineator starts out [DelineatorState::Searching], scanning every bit position for the
//! 24-bit frame sync. A single sync moves it to [DelineatorState::PreSync]; a second sync
//! exactly one frame later locks it. While locked, the next sync is looked for within a small
//! window around the expected position, preferring the exact cadence and then the nearest
//! offset. When no sync is found the frame is emitted anyway, marked as sync-predicted, and the
//! delineator is [DelineatorState::Slipping]. Too many consecutive misses drop it back to
//! searching.

use crate::{
    efm::{ChannelFrame, F3_FRAME_BITS, SYNC_BITS, SYNC_PATTERN},
    pipeline::stage::{Stage, StageQueue},
    types::enums::DelineatorState,
};
use bit_vec::BitVec;

/// The default number of consecutive missing syncs tolerated before searching again.
pub const DEFAULT_SLIP_TOLERANCE: usize = 5;
/// The default distance in bits, either side of the expected position, searched for a sync.
pub const DEFAULT_SYNC_WINDOW: usize = 3;

const SYNC_MASK: u32 = (1 << SYNC_BITS) - 1;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DelineatorStats {
    /// Frames emitted, including sync-predicted frames.
    pub frames: u64,
    /// Frames emitted without a sync.
    pub predicted: u64,
    /// Syncs found away from the exact cadence.
    pub slips: u64,
    /// Times the delineator lost lock and returned to searching.
    pub resyncs: u64,
    /// Bits consumed while not locked.
    pub bits_discarded: u64,
}

pub struct BitDelineator {
    state: DelineatorState,
    shift_reg: u32,
    frame: BitVec,
    start_predicted: bool,
    misses: usize,
    slip_tolerance: usize,
    window: usize,
    out: StageQueue<ChannelFrame>,
    stats: DelineatorStats,
}

impl Default for BitDelineator {
    fn default() -> Self {
        Self::new(DEFAULT_SLIP_TOLERANCE, DEFAULT_SYNC_WINDOW)
    }
}

impl BitDelineator {
    pub fn new(slip_tolerance: usize, window: usize) -> Self {
        Self {
            state: DelineatorState::Searching,
            shift_reg: 0,
            frame: BitVec::with_capacity(F3_FRAME_BITS + SYNC_BITS + window),
            start_predicted: false,
            misses: 0,
            slip_tolerance,
            window: window.min(SYNC_BITS),
            out: StageQueue::new(2),
            stats: DelineatorStats::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> DelineatorState {
        self.state
    }

    #[inline]
    pub fn stats(&self) -> DelineatorStats {
        self.stats
    }

    /// Push 8 channel bits, most significant bit first.
    pub fn push_byte(&mut self, byte: u8) {
        for i in (0..8).rev() {
            self.push_bit(byte & (1 << i) != 0);
        }
    }

    pub fn push_bit(&mut self, bit: bool) {
        self.shift_reg = ((self.shift_reg << 1) | bit as u32) & SYNC_MASK;

        match self.state {
            DelineatorState::Searching => {
                self.stats.bits_discarded += 1;
                if self.shift_reg == SYNC_PATTERN {
                    log::debug!("BitDelineator: sync candidate found");
                    self.restart_at_sync();
                    self.state = DelineatorState::PreSync;
                }
            }
            DelineatorState::PreSync => {
                self.frame.push(bit);
                if self.shift_reg == SYNC_PATTERN {
                    let sync_start = self.frame.len() - SYNC_BITS;
                    if sync_start == F3_FRAME_BITS {
                        log::debug!("BitDelineator: locked");
                        self.emit_and_advance(F3_FRAME_BITS, false);
                        self.start_predicted = false;
                        self.misses = 0;
                        self.state = DelineatorState::Locked;
                    }
                    else {
                        self.stats.bits_discarded += sync_start as u64;
                        self.restart_at_sync();
                    }
                }
                else if self.frame.len() > F3_FRAME_BITS + SYNC_BITS {
                    self.stats.bits_discarded += self.frame.len() as u64;
                    self.frame.truncate(0);
                    self.state = DelineatorState::Searching;
                }
            }
            DelineatorState::Locked | DelineatorState::Slipping => {
                self.frame.push(bit);
                if self.frame.len() == F3_FRAME_BITS + SYNC_BITS + self.window {
                    self.resolve_frame();
                }
            }
        }
    }

    /// Start a new frame buffer holding just the sync pattern that was found.
    fn restart_at_sync(&mut self) {
        self.frame.truncate(0);
        for i in (0..SYNC_BITS).rev() {
            self.frame.push(SYNC_PATTERN & (1 << i) != 0);
        }
    }

    fn sync_at(&self, offset: usize) -> bool {
        (0..SYNC_BITS).all(|i| self.frame[offset + i] == (SYNC_PATTERN & (1 << (SYNC_BITS - 1 - i)) != 0))
    }

    /// Locate the sync that ends the current frame and emit the frame. A frame is marked
    /// sync-predicted when the sync it starts at was missing.
    fn resolve_frame(&mut self) {
        let mut found = None;
        for distance in 0..=self.window {
            let candidates = [F3_FRAME_BITS - distance, F3_FRAME_BITS + distance];
            if let Some(&offset) = candidates.iter().find(|&&o| self.sync_at(o)) {
                found = Some(offset);
                break;
            }
        }

        let predicted = self.start_predicted;
        match found {
            Some(offset) => {
                if offset != F3_FRAME_BITS {
                    log::debug!(
                        "BitDelineator: sync slipped by {} bits",
                        offset as isize - F3_FRAME_BITS as isize
                    );
                    self.stats.slips += 1;
                }
                self.emit_and_advance(offset, predicted);
                self.start_predicted = false;
                self.misses = 0;
                self.state = DelineatorState::Locked;
            }
            None => {
                self.misses += 1;
                self.emit_and_advance(F3_FRAME_BITS, predicted);
                if self.misses > self.slip_tolerance {
                    log::warn!("BitDelineator: sync lost after {} missing syncs, searching", self.misses);
                    self.stats.resyncs += 1;
                    self.stats.bits_discarded += self.frame.len() as u64;
                    self.frame.truncate(0);
                    self.start_predicted = false;
                    self.misses = 0;
                    self.state = DelineatorState::Searching;
                }
                else {
                    log::trace!("BitDelineator: sync missing, predicting frame boundary");
                    self.start_predicted = true;
                    self.state = DelineatorState::Slipping;
                }
            }
        }
    }

    /// Emit the first `boundary` bits as a frame and keep the rest as the start of the next one.
    /// Frames shorter than 588 bits are zero-padded; longer ones are truncated.
    fn emit_and_advance(&mut self, boundary: usize, sync_predicted: bool) {
        let mut bits = BitVec::from_elem(F3_FRAME_BITS, false);
        for i in 0..boundary.min(F3_FRAME_BITS) {
            bits.set(i, self.frame[i]);
        }
        let rest: BitVec = self.frame.iter().skip(boundary).collect();
        self.frame = rest;

        self.stats.frames += 1;
        if sync_predicted {
            self.stats.predicted += 1;
        }
        self.out.push(ChannelFrame { bits, sync_predicted });
    }
}

impl Stage for BitDelineator {
    type Input = bool;
    type Output = ChannelFrame;

    fn push(&mut self, input: bool) {
        self.push_bit(input);
    }

    fn pull(&mut self) -> Option<ChannelFrame> {
        self.out.pop()
    }

    /// Emit a trailing complete frame. The final frame of a stream has no sync after it.
    fn flush(&mut self) {
        if matches!(self.state, DelineatorState::Locked | DelineatorState::Slipping)
            && self.frame.len() >= F3_FRAME_BITS
        {
            self.emit_and_advance(F3_FRAME_BITS, self.start_predicted);
        }
        self.start_predicted = false;
        self.stats.bits_discarded += self.frame.len() as u64;
        self.frame.truncate(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a frame of 588 bits starting with the sync and containing no sync-like patterns.
    fn frame_bits() -> Vec<bool> {
        let mut bits: Vec<bool> = (0..SYNC_BITS).rev().map(|i| SYNC_PATTERN & (1 << i) != 0).collect();
        while bits.len() < F3_FRAME_BITS {
            // A repeating run of ones separated by 3 zeros never forms a sync.
            bits.push(bits.len() % 4 == 0);
        }
        bits
    }

    fn push_all(delineator: &mut BitDelineator, bits: &[bool]) -> Vec<ChannelFrame> {
        bits.iter().flat_map(|&b| delineator.process(b)).collect()
    }

    #[test]
    fn test_lock_on_second_sync() {
        let mut delineator = BitDelineator::default();
        let mut stream = vec![false, true, true, false, true];
        for _ in 0..5 {
            stream.extend(frame_bits());
        }
        let mut frames = push_all(&mut delineator, &stream);
        assert_eq!(delineator.state(), DelineatorState::Locked);
        delineator.flush();
        frames.extend(delineator.drain());
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|f| !f.sync_predicted));
        assert!(frames.iter().all(|f| f.bits.iter().zip(frame_bits()).all(|(a, b)| a == b)));
    }

    #[test]
    fn test_slip_within_window() {
        let mut delineator = BitDelineator::default();
        let mut stream = Vec::new();
        for i in 0..6 {
            let mut bits = frame_bits();
            if i == 3 {
                // Frame 3 is two bits long.
                bits.extend([false, false]);
            }
            stream.extend(bits);
        }
        let frames = push_all(&mut delineator, &stream);
        assert_eq!(delineator.stats().slips, 1);
        assert!(frames.iter().all(|f| !f.sync_predicted));
    }

    #[test]
    fn test_missing_sync_predicted() {
        let mut delineator = BitDelineator::default();
        let mut stream = Vec::new();
        for i in 0..10 {
            let mut bits = frame_bits();
            if i == 4 {
                // Destroy the sync of frame 4.
                bits[0] = false;
            }
            stream.extend(bits);
        }
        let frames = push_all(&mut delineator, &stream);
        let predicted: Vec<usize> = frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.sync_predicted)
            .map(|(i, _)| i)
            .collect();
        // Only the frame starting at the missing sync is predicted.
        assert_eq!(predicted, vec![4]);
        assert_eq!(delineator.state(), DelineatorState::Locked);
    }

    #[test]
    fn test_resync_after_tolerance() {
        let mut delineator = BitDelineator::new(2, 3);
        let mut stream = Vec::new();
        for _ in 0..3 {
            stream.extend(frame_bits());
        }
        let mut dead = frame_bits();
        dead[0] = false;
        for _ in 0..4 {
            stream.extend(dead.iter().copied());
        }
        push_all(&mut delineator, &stream);
        assert_eq!(delineator.state(), DelineatorState::Searching);
        assert_eq!(delineator.stats().resyncs, 1);
        assert_eq!(delineator.stats().predicted, 2);
    }
}
