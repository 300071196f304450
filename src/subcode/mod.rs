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

//! Subcode blocks.
//!
//! Every F3 frame carries one subcode symbol. 98 consecutive symbols form a subcode block; the
//! first two positions of a block carry the S0 and S1 sync patterns and the remaining 96 bytes
//! carry one bit of each of the eight subcode channels P..W. Only the Q channel (bit 6) is
//! interpreted here.

pub mod assembler;
pub mod crc;
pub mod q_channel;

pub use assembler::{SubcodeAssembler, SubcodeStats};
pub use q_channel::QChannel;

use crate::{types::enums::SyncHeader, FRAMES_PER_SECTOR};
use q_channel::Q_BLOCK_BYTES;

/// The number of subcode symbols in a block.
pub const SUBCODE_BLOCK_LEN: usize = FRAMES_PER_SECTOR;
/// The number of sync positions at the start of a block.
pub const SUBCODE_SYNC_LEN: usize = 2;
/// The Q channel bit of each subcode byte.
pub const Q_CHANNEL_BIT: u8 = 0x40;

/// One subcode symbol, as split from an F3 frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SubcodeSymbol {
    pub header: SyncHeader,
    pub value:  u8,
    pub erased: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubcodeBlock {
    pub bytes: [u8; SUBCODE_BLOCK_LEN],
    /// The number of erased symbols in the block.
    pub erasures: usize,
    pub q: QChannel,
}

impl SubcodeBlock {
    /// Assemble a block from 98 symbols. The Q channel is extracted and checked.
    pub fn from_symbols(symbols: &[SubcodeSymbol]) -> Self {
        let mut bytes = [0u8; SUBCODE_BLOCK_LEN];
        for (b, s) in bytes.iter_mut().zip(symbols.iter()) {
            *b = s.value;
        }
        let erasures = symbols.iter().filter(|s| s.erased).count();
        let q = QChannel::from_raw(Self::extract_q(&bytes));
        SubcodeBlock { bytes, erasures, q }
    }

    /// Build the subcode bytes for a block carrying `q`. The remaining channels are zero.
    pub fn from_q(q: &QChannel) -> Self {
        let mut bytes = [0u8; SUBCODE_BLOCK_LEN];
        for bit in 0..Q_BLOCK_BYTES * 8 {
            if q.raw[bit / 8] & (0x80 >> (bit % 8)) != 0 {
                bytes[SUBCODE_SYNC_LEN + bit] |= Q_CHANNEL_BIT;
            }
        }
        SubcodeBlock { bytes, erasures: 0, q: *q }
    }

    /// Return the sync header and subcode byte to place in F3 frame `index` of this block.
    pub fn frame_symbol(&self, index: usize) -> (SyncHeader, u8) {
        match index {
            0 => (SyncHeader::Sync0, 0),
            1 => (SyncHeader::Sync1, 0),
            _ => (SyncHeader::None, self.bytes[index % SUBCODE_BLOCK_LEN]),
        }
    }

    /// Gather the Q channel bits from bytes 2..98, most significant bit first.
    pub fn extract_q(bytes: &[u8; SUBCODE_BLOCK_LEN]) -> [u8; Q_BLOCK_BYTES] {
        let mut raw = [0u8; Q_BLOCK_BYTES];
        for (bit, &byte) in bytes[SUBCODE_SYNC_LEN..].iter().enumerate() {
            if byte & Q_CHANNEL_BIT != 0 {
                raw[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::msf::TrackTime;

    #[test]
    fn test_block_q_round_trip() {
        let q = QChannel::position(0, 1, 1, TrackTime::new(0, 1, 2).unwrap(), TrackTime::new(0, 3, 2).unwrap());
        let block = SubcodeBlock::from_q(&q);
        assert_eq!(SubcodeBlock::extract_q(&block.bytes), q.raw);
        assert!(block.bytes.iter().all(|&b| b & !Q_CHANNEL_BIT == 0));
        assert_eq!(block.frame_symbol(0).0, SyncHeader::Sync0);
        assert_eq!(block.frame_symbol(1).0, SyncHeader::Sync1);
    }
}
