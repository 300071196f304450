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

//! The decoding pipeline.
//!
//! [EfmDecoder] owns one instance of every stage and moves data between them:
//!
//! ```text
//! channel bits -> BitDelineator -> EfmDemodulator -> F3Splitter -> CircDecoder -> SectorAssembler
//!                                                        |                               |
//!                                                        +-> SubcodeAssembler ---> MetadataSink
//! ```
//!
//! Framed input enters at the splitter. The decoder is driven by pushing input and draining
//! [DecodeEvent]s; [decode_reader] and [decode_segments] wrap that loop for readers.

pub mod decoder;
pub mod driver;
pub mod splitter;
pub mod stage;

pub use decoder::{EfmDecoder, F1Tap};
pub use driver::{decode_reader, decode_segments, SegmentOutput};
pub use stage::Stage;

use crate::{
    circ::CodewordCounts,
    efm::{
        delineator::{DelineatorStats, DEFAULT_SLIP_TOLERANCE, DEFAULT_SYNC_WINDOW},
        demodulator::DemodulatorStats,
    },
    metadata::SectorMetadata,
    sector::{
        assembler::{AssemblerStats, DEFAULT_MAX_GAP, DEFAULT_MISMATCH_LIMIT},
        Sector,
    },
    subcode::{QChannel, SubcodeStats},
    types::{enums::SectorStatus, frames::F3_PAYLOAD_BYTES},
};
use binrw::binrw;

/// The length of one framed F3 record.
pub const FRAMED_RECORD_BYTES: usize = 1 + F3_PAYLOAD_BYTES;

/// The format of the decoder's input.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputFormat {
    /// Channel bits packed MSB-first.
    #[default]
    ChannelBits,
    /// 33-byte records of an already delineated and demodulated F3 frame: the subcode byte
    /// followed by the 32 payload bytes.
    FramedF3,
}

/// A framed F3 record as read from framed input.
#[binrw]
#[brw(big)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FramedF3Record {
    pub subcode: u8,
    pub payload: [u8; F3_PAYLOAD_BYTES],
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeOptions {
    pub input_format: InputFormat,
    /// Consecutive missing frame syncs tolerated before the delineator searches again.
    pub slip_tolerance: usize,
    /// Bits either side of the expected frame boundary searched for a sync.
    pub sync_window: usize,
    /// Consecutive sector sync mismatches tolerated before the sector assembler searches again.
    pub sector_mismatch_limit: usize,
    /// The largest address gap that is filled with lost records.
    pub max_gap: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            input_format: InputFormat::ChannelBits,
            slip_tolerance: DEFAULT_SLIP_TOLERANCE,
            sync_window: DEFAULT_SYNC_WINDOW,
            sector_mismatch_limit: DEFAULT_MISMATCH_LIMIT,
            max_gap: DEFAULT_MAX_GAP,
        }
    }
}

/// An output of the decoder, in stream order.
#[derive(Clone, Debug)]
pub enum DecodeEvent {
    /// A sector with image bytes, and its metadata record.
    Sector(Sector, SectorMetadata),
    /// The metadata record of a sector that produced no image bytes.
    Lost(SectorMetadata),
    /// A subcode Q block that passed its CRC.
    Subcode(QChannel),
    /// Decoding was cancelled. No further events follow.
    Cancelled,
    /// All input was processed. No further events follow.
    Finished,
}

/// Sector totals by status.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusCounts {
    pub ok: u64,
    pub corrected: u64,
    pub edc_fail: u64,
    pub bad: u64,
    pub lost: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: SectorStatus) {
        match status {
            SectorStatus::Ok => self.ok += 1,
            SectorStatus::Corrected => self.corrected += 1,
            SectorStatus::EdcFail => self.edc_fail += 1,
            SectorStatus::Bad => self.bad += 1,
            SectorStatus::Lost => self.lost += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.ok + self.corrected + self.edc_fail + self.bad + self.lost
    }

    /// Sectors counted against a bad-sector budget.
    pub fn bad_total(&self) -> u64 {
        self.edc_fail + self.bad + self.lost
    }
}

/// Statistics gathered over a decode.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeReport {
    pub delineator: DelineatorStats,
    pub demodulator: DemodulatorStats,
    pub subcode: SubcodeStats,
    pub assembler: AssemblerStats,
    pub c1: CodewordCounts,
    pub c2: CodewordCounts,
    /// F3 frames that entered the splitter.
    pub f3_frames: u64,
    pub sectors: StatusCounts,
    pub cancelled: bool,
}

impl DecodeReport {
    /// Returns true if at least one F3 frame was recovered from the input.
    pub fn synchronised(&self) -> bool {
        self.f3_frames > 0
    }

    pub fn bad_sectors(&self) -> u64 {
        self.sectors.bad_total()
    }
}
