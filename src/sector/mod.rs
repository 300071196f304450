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

//! Sectors are 2352-byte blocks cut from the F1 byte stream. Each begins with a 12-byte sync
//! pattern and a 4-byte header holding the BCD address and the mode. The mode determines how
//! the remaining 2336 bytes are validated.
//!
//! | Mode | Layout                                                                       |
//! |------|------------------------------------------------------------------------------|
//! | 0    | 2336 zero bytes                                                              |
//! | 1    | 2048 user bytes, 4-byte EDC, 8 zero bytes, 172 bytes P parity, 104 bytes Q parity |
//! | 2    | 2336 user bytes, forwarded verbatim                                          |
//!
//! The Mode 1 ECC also covers the header, so a damaged mode byte is repaired along with the
//! rest of the sector. A sector that does not read as Mode 1 but still carries the zeroed
//! reserved field of one is given a P/Q repair attempt before it is judged by its mode.

pub mod assembler;
pub mod builder;
pub mod ecc;
pub mod edc;
pub mod header;

pub use assembler::{AssembledSector, SectorAssembler};
pub use builder::SectorBuilder;
pub use header::SectorHeader;

use crate::{
    sector::{
        ecc::{correct_ecc, EccOutcome},
        edc::edc,
        header::HEADER_OFFSET,
    },
    types::{
        enums::{SectorMode, SectorStatus},
        msf::TrackTime,
    },
};

pub const SECTOR_SIZE: usize = 2352;
pub const SECTOR_SYNC: [u8; 12] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];
/// Offset of the first byte following the header.
pub const DATA_OFFSET: usize = 16;
pub const MODE1_USER_LEN: usize = 2048;
pub const MODE2_USER_LEN: usize = 2336;
/// Offset of the Mode 1 EDC. The EDC covers every byte before it.
pub const EDC_OFFSET: usize = 2064;
/// Offset of the eight reserved zero bytes of a Mode 1 sector.
pub const ZERO_OFFSET: usize = 2068;

/// A sector cut from the F1 byte stream, with its validation outcome.
#[derive(Clone, Debug)]
pub struct Sector {
    /// The address from the sector header, if the header was usable.
    pub address: Option<TrackTime>,
    pub mode: SectorMode,
    pub status: SectorStatus,
    pub data: Box<[u8; SECTOR_SIZE]>,
    /// Per-byte error flags. Bytes repaired by the sector's ECC are cleared.
    pub errors: Vec<bool>,
}

impl Sector {
    /// Validate a raw sector according to its mode. `c2_corrected` marks a sector containing
    /// bytes repaired by the C2 decoder.
    pub fn from_raw(data: Box<[u8; SECTOR_SIZE]>, errors: Vec<bool>, c2_corrected: bool) -> Self {
        let mut sector = Sector {
            address: None,
            mode: SectorMode::from(data[HEADER_OFFSET + 3]),
            status: SectorStatus::Ok,
            data,
            errors,
        };
        sector.validate(c2_corrected);
        sector
    }

    fn validate(&mut self, c2_corrected: bool) {
        let clean_status = if c2_corrected {
            SectorStatus::Corrected
        }
        else {
            SectorStatus::Ok
        };
        if self.mode != SectorMode::Mode1 && self.may_be_mode1() {
            if let Some(outcome) = self.repair_mode1() {
                log::debug!(
                    "Sector::validate(): mode byte repaired to Mode 1, P/Q corrected {} bytes",
                    outcome.corrected
                );
                self.status = SectorStatus::Corrected;
                self.read_address();
                return;
            }
        }
        let flagged = self.has_errors();

        self.status = match self.mode {
            SectorMode::Mode0 => {
                if !flagged && self.data[DATA_OFFSET..].iter().all(|&b| b == 0) {
                    clean_status
                }
                else {
                    SectorStatus::Bad
                }
            }
            SectorMode::Mode1 => self.validate_mode1(clean_status),
            SectorMode::Mode2 => {
                if flagged {
                    SectorStatus::Bad
                }
                else {
                    clean_status
                }
            }
            SectorMode::Unknown(mode) => {
                log::debug!("Sector::validate(): unknown mode byte {:02X}", mode);
                SectorStatus::Bad
            }
        };

        self.read_address();
    }

    /// Read the address from the header. The header is read after validation, since the
    /// Mode 1 ECC also covers it.
    fn read_address(&mut self) {
        self.address = header::SectorHeader::from_sector(&self.data[..])
            .ok()
            .and_then(|h| h.address());
        if self.address.is_none() {
            log::debug!("Sector::validate(): unusable header {:02X?}", &self.data[12..16]);
            self.status = SectorStatus::Bad;
        }
    }

    fn validate_mode1(&mut self, clean_status: SectorStatus) -> SectorStatus {
        if self.edc_ok() {
            if self.has_errors() {
                // Every flagged byte was in fact intact.
                self.errors.iter_mut().for_each(|e| *e = false);
                return SectorStatus::Corrected;
            }
            return clean_status;
        }

        match self.repair_mode1() {
            Some(outcome) => {
                log::debug!(
                    "Sector::validate_mode1(): P/Q corrected {} bytes",
                    outcome.corrected
                );
                SectorStatus::Corrected
            }
            None => SectorStatus::EdcFail,
        }
    }

    /// Unknown mode bytes, and sectors whose reserved Mode 1 field is zero.
    fn may_be_mode1(&self) -> bool {
        matches!(self.mode, SectorMode::Unknown(_))
            || self.data[ZERO_OFFSET..ZERO_OFFSET + 8].iter().all(|&b| b == 0)
    }

    /// Run P/Q correction on a copy of the sector. The copy replaces the sector only if its EDC
    /// then passes and its mode byte reads Mode 1.
    fn repair_mode1(&mut self) -> Option<EccOutcome> {
        let mut repaired = self.data.clone();
        let mut flags = self.errors.clone();
        let outcome = correct_ecc(&mut repaired, &mut flags);
        let edc_ok = edc(&repaired[..EDC_OFFSET]).to_le_bytes() == repaired[EDC_OFFSET..EDC_OFFSET + 4];
        if !edc_ok || SectorMode::from(repaired[HEADER_OFFSET + 3]) != SectorMode::Mode1 {
            log::debug!(
                "Sector::repair_mode1(): EDC failure, {} vectors uncorrectable",
                outcome.uncorrectable
            );
            return None;
        }
        self.data = repaired;
        self.mode = SectorMode::Mode1;
        self.errors.iter_mut().for_each(|e| *e = false);
        Some(outcome)
    }

    /// Return true if the stored EDC matches the EDC computed over the sector.
    pub fn edc_ok(&self) -> bool {
        edc(&self.data[..EDC_OFFSET]).to_le_bytes() == self.data[EDC_OFFSET..EDC_OFFSET + 4]
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|&e| e)
    }

    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|&&e| e).count()
    }

    /// Return the user data area as defined by the sector's mode.
    pub fn user_data(&self) -> &[u8] {
        match self.mode {
            SectorMode::Mode1 => &self.data[DATA_OFFSET..DATA_OFFSET + MODE1_USER_LEN],
            SectorMode::Mode2 => &self.data[DATA_OFFSET..DATA_OFFSET + MODE2_USER_LEN],
            _ => &[],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }
}
