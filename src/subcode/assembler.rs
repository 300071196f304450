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

//! The subcode assembler groups subcode symbols into 98-symbol blocks.
//!
//! When the F3 frames carry S0/S1 sync headers, every S0 starts a new block. Without them (for
//! example with framed input, which carries no sync headers) the assembler slides a 98-symbol
//! window until the Q CRC validates, then continues on the 98-symbol cadence. Repeated CRC
//! failures on the cadence release the phase and the sliding search starts again.

use crate::{
    pipeline::stage::{Stage, StageQueue},
    subcode::{SubcodeBlock, SubcodeSymbol, SUBCODE_BLOCK_LEN},
    types::enums::SyncHeader,
};
use std::collections::VecDeque;

/// Consecutive Q CRC failures tolerated on an unanchored cadence.
const MAX_CADENCE_FAILURES: usize = 3;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubcodeStats {
    pub blocks: u64,
    pub q_valid: u64,
    pub q_invalid: u64,
    /// Partial blocks discarded when an S0 arrived early.
    pub partial_blocks: u64,
    pub erased_symbols: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    /// Looking for a window with a valid Q CRC.
    Sliding,
    /// Block boundaries follow the most recent S0.
    Anchored,
    /// Block boundaries follow the cadence of an earlier valid block.
    Cadence,
}

pub struct SubcodeAssembler {
    window: VecDeque<SubcodeSymbol>,
    phase: Phase,
    cadence_failures: usize,
    out: StageQueue<SubcodeBlock>,
    stats: SubcodeStats,
}

impl Default for SubcodeAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl SubcodeAssembler {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(SUBCODE_BLOCK_LEN + 1),
            phase: Phase::Sliding,
            cadence_failures: 0,
            out: StageQueue::new(1),
            stats: SubcodeStats::default(),
        }
    }

    pub fn stats(&self) -> SubcodeStats {
        self.stats
    }

    fn take_block(&mut self) -> SubcodeBlock {
        let symbols: Vec<SubcodeSymbol> = self.window.drain(..).collect();
        SubcodeBlock::from_symbols(&symbols)
    }

    fn emit(&mut self, block: SubcodeBlock) {
        self.stats.blocks += 1;
        if block.q.crc_ok {
            self.stats.q_valid += 1;
        }
        else {
            self.stats.q_invalid += 1;
            log::trace!("SubcodeAssembler: q-invalid block");
        }
        self.out.push(block);
    }
}

impl Stage for SubcodeAssembler {
    type Input = SubcodeSymbol;
    type Output = SubcodeBlock;

    fn push(&mut self, input: SubcodeSymbol) {
        if input.erased {
            self.stats.erased_symbols += 1;
        }

        if input.header == SyncHeader::Sync0 {
            if self.phase == Phase::Anchored && !self.window.is_empty() {
                log::debug!(
                    "SubcodeAssembler: S0 after {} symbols, discarding partial block",
                    self.window.len()
                );
                self.stats.partial_blocks += 1;
            }
            self.window.clear();
            self.window.push_back(input);
            self.phase = Phase::Anchored;
            return;
        }

        self.window.push_back(input);
        match self.phase {
            Phase::Sliding => {
                if self.window.len() > SUBCODE_BLOCK_LEN {
                    self.window.pop_front();
                }
                if self.window.len() == SUBCODE_BLOCK_LEN {
                    let symbols: Vec<SubcodeSymbol> = self.window.iter().copied().collect();
                    let block = SubcodeBlock::from_symbols(&symbols);
                    if block.q.crc_ok {
                        log::debug!("SubcodeAssembler: block phase found by Q CRC");
                        self.window.clear();
                        self.phase = Phase::Cadence;
                        self.cadence_failures = 0;
                        self.emit(block);
                    }
                }
            }
            Phase::Anchored => {
                if self.window.len() == SUBCODE_BLOCK_LEN {
                    let block = self.take_block();
                    self.emit(block);
                }
            }
            Phase::Cadence => {
                if self.window.len() == SUBCODE_BLOCK_LEN {
                    let block = self.take_block();
                    if block.q.crc_ok {
                        self.cadence_failures = 0;
                    }
                    else {
                        self.cadence_failures += 1;
                        if self.cadence_failures >= MAX_CADENCE_FAILURES {
                            log::debug!("SubcodeAssembler: Q CRC failing on cadence, searching");
                            self.phase = Phase::Sliding;
                        }
                    }
                    self.emit(block);
                }
            }
        }
    }

    fn pull(&mut self) -> Option<SubcodeBlock> {
        self.out.pop()
    }

    fn flush(&mut self) {
        if !self.window.is_empty() && self.phase != Phase::Sliding {
            self.stats.partial_blocks += 1;
        }
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{subcode::QChannel, types::msf::TrackTime};

    fn block_symbols(absolute: u32, with_sync: bool) -> Vec<SubcodeSymbol> {
        let q = QChannel::position(0, 1, 1, TrackTime::from_index(absolute), TrackTime::from_index(absolute + 150));
        let block = SubcodeBlock::from_q(&q);
        (0..SUBCODE_BLOCK_LEN)
            .map(|i| {
                let (header, value) = block.frame_symbol(i);
                SubcodeSymbol {
                    header: if with_sync { header } else { SyncHeader::None },
                    value,
                    erased: false,
                }
            })
            .collect()
    }

    #[test]
    fn test_anchored_blocks() {
        let mut assembler = SubcodeAssembler::new();
        let mut blocks = Vec::new();
        // Start mid-block; the partial block before the first S0 is ignored.
        for s in block_symbols(0, true).into_iter().skip(40) {
            blocks.extend(assembler.process(s));
        }
        for n in 1..4 {
            for s in block_symbols(n, true) {
                blocks.extend(assembler.process(s));
            }
        }
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.q.crc_ok));
        assert_eq!(blocks[0].q.relative, Some(TrackTime::from_index(1)));
    }

    #[test]
    fn test_sliding_phase_lock() {
        let mut assembler = SubcodeAssembler::new();
        let mut blocks = Vec::new();
        for s in block_symbols(0, false).into_iter().skip(17) {
            blocks.extend(assembler.process(s));
        }
        for n in 1..4 {
            for s in block_symbols(n, false) {
                blocks.extend(assembler.process(s));
            }
        }
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2].q.relative, Some(TrackTime::from_index(3)));
        assert_eq!(assembler.stats().q_invalid, 0);
    }

    #[test]
    fn test_q_invalid_block() {
        let mut assembler = SubcodeAssembler::new();
        let mut symbols = block_symbols(5, true);
        symbols[50].value ^= 0x40;
        let blocks: Vec<SubcodeBlock> = symbols.into_iter().flat_map(|s| assembler.process(s)).collect();
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].q.crc_ok);
        assert_eq!(assembler.stats().q_invalid, 1);
    }
}
