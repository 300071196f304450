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

//! The EFM demodulator turns 588-bit channel frames into F3 frames.

use crate::{
    efm::{
        symbol_offset,
        table::{efm_decode, EFM_SYMBOL_BITS, SYNC_S0, SYNC_S1},
        ChannelFrame,
        F3_SYMBOLS,
    },
    pipeline::stage::{Stage, StageQueue},
    types::{enums::SyncHeader, flags::FrameFlags, frames::F3Frame},
};
use bit_vec::BitVec;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DemodulatorStats {
    pub frames: u64,
    /// Symbols whose channel pattern is not in the EFM table.
    pub invalid_symbols: u64,
}

pub struct EfmDemodulator {
    out:   StageQueue<F3Frame>,
    stats: DemodulatorStats,
}

impl Default for EfmDemodulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the 14-bit pattern starting at `offset`.
fn read_symbol(bits: &BitVec, offset: usize) -> u16 {
    (offset..offset + EFM_SYMBOL_BITS)
        .fold(0u16, |acc, i| (acc << 1) | bits.get(i).unwrap_or(false) as u16)
}

impl EfmDemodulator {
    pub fn new() -> Self {
        Self {
            out:   StageQueue::new(1),
            stats: DemodulatorStats::default(),
        }
    }

    pub fn stats(&self) -> DemodulatorStats {
        self.stats
    }

    pub fn demodulate(&mut self, frame: &ChannelFrame) -> F3Frame {
        let mut f3 = F3Frame::default();
        if frame.sync_predicted {
            f3.flags |= FrameFlags::SYNC_PREDICTED;
        }

        let subcode_pattern = read_symbol(&frame.bits, symbol_offset(0));
        match subcode_pattern {
            SYNC_S0 => f3.header = SyncHeader::Sync0,
            SYNC_S1 => f3.header = SyncHeader::Sync1,
            pattern => match efm_decode(pattern) {
                Some(byte) => f3.subcode = byte,
                None => {
                    self.stats.invalid_symbols += 1;
                    f3.subcode_erased = true;
                }
            },
        }

        for symbol in 1..F3_SYMBOLS {
            match efm_decode(read_symbol(&frame.bits, symbol_offset(symbol))) {
                Some(byte) => f3.payload[symbol - 1] = byte,
                None => {
                    self.stats.invalid_symbols += 1;
                    f3.erasures[symbol - 1] = true;
                }
            }
        }

        self.stats.frames += 1;
        log::trace!(
            "EfmDemodulator: frame {} header {:?} with {} erasures",
            self.stats.frames,
            f3.header,
            f3.erasure_count()
        );
        f3
    }
}

impl Stage for EfmDemodulator {
    type Input = ChannelFrame;
    type Output = F3Frame;

    fn push(&mut self, input: ChannelFrame) {
        let frame = self.demodulate(&input);
        self.out.push(frame);
    }

    fn pull(&mut self) -> Option<F3Frame> {
        self.out.pop()
    }

    fn flush(&mut self) {}
}
