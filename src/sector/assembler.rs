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

//! The sector assembler cuts the F1 byte stream into sectors.
//!
//! While searching, the assembler scans for the 12-byte sector sync. Once found it locks and
//! cuts consecutive 2352-byte slots. A slot that does not start with the sync is reported as
//! lost; after `mismatch_limit` consecutive mismatches the assembler returns to searching,
//! starting one byte into the slot that failed.
//!
//! Sector addresses are expected to increase by one. A sector that arrives a short distance
//! ahead of the expected address has the gap filled with lost records. Within one lock, a
//! sector whose address does not advance is marked bad and its address is left to
//! interpolation. A resync starts a new ordering, so the first sector after it may take any
//! address.

use crate::{
    pipeline::stage::{Stage, StageQueue},
    sector::{Sector, SECTOR_SIZE, SECTOR_SYNC},
    types::{enums::SectorStatus, frames::F1Frame, msf::TrackTime},
};

/// The default number of consecutive sync mismatches tolerated while locked.
pub const DEFAULT_MISMATCH_LIMIT: usize = 3;
/// The default largest address gap filled with lost records.
pub const DEFAULT_MAX_GAP: u32 = 150;

/// The output of the sector assembler.
#[derive(Clone, Debug)]
pub enum AssembledSector {
    Sector(Sector),
    /// A sector slot that produced no usable bytes. The address is set when it is known from
    /// the surrounding sectors.
    Lost { address: Option<TrackTime> },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssemblerStats {
    pub sectors: u64,
    pub lost: u64,
    pub sync_mismatches: u64,
    pub resyncs: u64,
    pub bytes_discarded: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum AssemblerState {
    Searching,
    Locked { mismatches: usize },
}

pub struct SectorAssembler {
    bytes: Vec<u8>,
    errors: Vec<bool>,
    corrected: Vec<bool>,
    state: AssemblerState,
    mismatch_limit: usize,
    max_gap: u32,
    last_address: Option<TrackTime>,
    last_header: Option<TrackTime>,
    out: StageQueue<AssembledSector>,
    stats: AssemblerStats,
}

impl Default for SectorAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MISMATCH_LIMIT, DEFAULT_MAX_GAP)
    }
}

impl SectorAssembler {
    pub fn new(mismatch_limit: usize, max_gap: u32) -> Self {
        Self {
            bytes: Vec::with_capacity(SECTOR_SIZE * 2),
            errors: Vec::with_capacity(SECTOR_SIZE * 2),
            corrected: Vec::with_capacity(SECTOR_SIZE * 2),
            state: AssemblerState::Searching,
            mismatch_limit: mismatch_limit.max(1),
            max_gap,
            last_address: None,
            last_header: None,
            // A single push can emit a mismatch record, a full gap and a sector.
            out: StageQueue::new(max_gap as usize + 2),
            stats: AssemblerStats::default(),
        }
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, AssemblerState::Locked { .. })
    }

    /// A sync matches if every byte that is not flagged as an error matches.
    fn sync_at(&self, offset: usize) -> bool {
        self.sync_prefix_at(offset, SECTOR_SYNC.len())
    }

    /// As [SectorAssembler::sync_at], over the first `len` bytes of the sync only.
    fn sync_prefix_at(&self, offset: usize, len: usize) -> bool {
        SECTOR_SYNC[..len]
            .iter()
            .enumerate()
            .all(|(i, &b)| self.errors[offset + i] || self.bytes[offset + i] == b)
    }

    fn start_search(&mut self) {
        self.state = AssemblerState::Searching;
        self.last_header = None;
    }

    fn find_sync(&self) -> Option<usize> {
        // Searching requires an exact byte match.
        self.bytes
            .windows(SECTOR_SYNC.len())
            .position(|w| w == SECTOR_SYNC)
    }

    fn discard(&mut self, count: usize) {
        self.bytes.drain(..count);
        self.errors.drain(..count);
        self.corrected.drain(..count);
    }

    fn next_address(&self) -> Option<TrackTime> {
        self.last_address.map(|a| a.next())
    }

    fn emit_lost(&mut self, address: Option<TrackTime>) {
        log::warn!(
            "SectorAssembler: lost sector at {}",
            address.map_or_else(|| "unknown address".to_string(), |a| a.to_string())
        );
        self.stats.lost += 1;
        self.last_address = address.or(self.last_address);
        self.out.push(AssembledSector::Lost { address });
    }

    fn emit_sector(&mut self, mut sector: Sector) {
        match sector.address {
            Some(address) if self.last_header.is_some_and(|last| address.index() <= last.index()) => {
                log::debug!(
                    "SectorAssembler: header address {} does not advance, interpolating",
                    address
                );
                sector.address = None;
                sector.status = SectorStatus::Bad;
                self.last_address = self.next_address();
            }
            Some(address) => {
                if let Some(last) = self.last_address {
                    let gap = last.distance_to(&address) - 1;
                    if gap > 0 && gap <= self.max_gap as i64 {
                        log::debug!("SectorAssembler: filling gap of {} sectors before {}", gap, address);
                        for _ in 0..gap {
                            let lost = self.next_address();
                            self.emit_lost(lost);
                        }
                    }
                    else if gap > 0 {
                        log::debug!("SectorAssembler: address jump from {} to {}", last, address);
                    }
                }
                self.last_header = Some(address);
                self.last_address = Some(address);
            }
            None => {
                self.last_address = self.next_address();
            }
        }
        self.stats.sectors += 1;
        self.out.push(AssembledSector::Sector(sector));
    }

    fn take_sector(&mut self) -> Sector {
        let mut data = Box::new([0u8; SECTOR_SIZE]);
        data.copy_from_slice(&self.bytes[..SECTOR_SIZE]);
        let errors = self.errors[..SECTOR_SIZE].to_vec();
        let c2_corrected = self.corrected[..SECTOR_SIZE].iter().any(|&c| c);
        self.discard(SECTOR_SIZE);
        Sector::from_raw(data, errors, c2_corrected)
    }

    fn run(&mut self) {
        loop {
            match self.state {
                AssemblerState::Searching => {
                    match self.find_sync() {
                        Some(offset) => {
                            log::debug!("SectorAssembler: sector sync found after {} bytes", offset);
                            self.stats.bytes_discarded += offset as u64;
                            self.discard(offset);
                            self.state = AssemblerState::Locked { mismatches: 0 };
                        }
                        None => {
                            let keep = SECTOR_SYNC.len() - 1;
                            if self.bytes.len() > keep {
                                let count = self.bytes.len() - keep;
                                self.stats.bytes_discarded += count as u64;
                                self.discard(count);
                            }
                            return;
                        }
                    }
                }
                AssemblerState::Locked { mismatches } => {
                    if self.bytes.len() < SECTOR_SIZE {
                        return;
                    }
                    if self.sync_at(0) {
                        self.state = AssemblerState::Locked { mismatches: 0 };
                        let sector = self.take_sector();
                        self.emit_sector(sector);
                        continue;
                    }

                    self.stats.sync_mismatches += 1;
                    let mismatches = mismatches + 1;
                    if mismatches >= self.mismatch_limit {
                        log::warn!(
                            "SectorAssembler: {} consecutive sync mismatches, searching",
                            mismatches
                        );
                        self.stats.resyncs += 1;
                        self.start_search();
                        self.discard(1);
                    }
                    else {
                        log::debug!("SectorAssembler: sync mismatch {} while locked", mismatches);
                        self.state = AssemblerState::Locked { mismatches };
                        self.discard(SECTOR_SIZE);
                        let lost = self.next_address();
                        self.emit_lost(lost);
                    }
                }
            }
        }
    }
}

impl Stage for SectorAssembler {
    type Input = F1Frame;
    type Output = AssembledSector;

    fn push(&mut self, input: F1Frame) {
        if input.is_lead_in() {
            return;
        }
        let corrected = input.is_c2_corrected();
        self.bytes.extend_from_slice(&input.data);
        self.errors.extend_from_slice(&input.errors);
        self.corrected.extend(std::iter::repeat(corrected).take(input.data.len()));
        self.run();
    }

    fn pull(&mut self) -> Option<AssembledSector> {
        self.out.pop()
    }

    fn flush(&mut self) {
        // An incomplete sector at the end of the input is reported but produces no bytes. A
        // tail shorter than the sync only has to match the sync bytes it holds.
        let present = self.bytes.len().min(SECTOR_SYNC.len());
        if self.is_locked() && present > 0 && self.sync_prefix_at(0, present) {
            log::debug!(
                "SectorAssembler: flushing incomplete sector of {} bytes",
                self.bytes.len()
            );
            let lost = self.next_address();
            self.emit_lost(lost);
        }
        let count = self.bytes.len();
        self.discard(count);
        self.start_search();
    }
}
