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

//! The metadata sink correlates assembled sectors with the subcode Q channel.
//!
//! Sector data runs roughly one sector behind the subcode, because of the CIRC delays, so the
//! sink keeps a short history of valid Q blocks. A sector whose header address appears as the
//! absolute time of a recent Q block is bound to it.

use crate::{
    circ::CodewordCounts,
    sector::{AssembledSector, Sector},
    subcode::QChannel,
    types::{
        enums::{AddressSource, SectorMode, SectorStatus},
        msf::TrackTime,
    },
};
use std::{
    collections::VecDeque,
    fmt::{self, Display, Formatter},
};

/// The number of valid Q blocks remembered for correlation.
pub const RECENT_Q_BLOCKS: usize = 8;

/// The metadata record of one sector slot.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorMetadata {
    pub address: TrackTime,
    /// The sector mode. `None` for a lost sector.
    pub mode: Option<SectorMode>,
    pub status: SectorStatus,
    /// C1 codeword outcomes since the previous record.
    pub c1: CodewordCounts,
    /// C2 codeword outcomes since the previous record.
    pub c2: CodewordCounts,
    pub source: AddressSource,
    /// The Q block the sector was bound to, if any.
    pub q: Option<QChannel>,
}

impl SectorMetadata {
    pub fn is_corrected(&self) -> bool {
        self.status == SectorStatus::Corrected
    }

    /// Format a line for the metadata sidecar: `MM:SS:FF,mode,status,c1,c2`.
    pub fn line(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.address,
            self.mode.map_or_else(|| "-".to_string(), |m| m.to_string()),
            self.status,
            self.c1,
            self.c2
        )
    }
}

impl Display for SectorMetadata {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.line())
    }
}

#[derive(Default)]
pub struct MetadataSink {
    recent_q: VecDeque<QChannel>,
    last_address: Option<TrackTime>,
}

impl MetadataSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decoded Q block. Blocks that failed their CRC are ignored.
    pub fn push_q(&mut self, q: &QChannel) {
        if !q.crc_ok {
            return;
        }
        if self.recent_q.len() == RECENT_Q_BLOCKS {
            self.recent_q.pop_front();
        }
        self.recent_q.push_back(*q);
    }

    fn find_q(&self, address: TrackTime) -> Option<QChannel> {
        self.recent_q
            .iter()
            .rev()
            .find(|q| q.absolute == Some(address))
            .copied()
    }

    /// The address following the previous record. Before any record, the most recent Q
    /// block's absolute time is used.
    fn interpolate(&self) -> TrackTime {
        match self.last_address {
            Some(address) => address.next(),
            None => self
                .recent_q
                .back()
                .and_then(|q| q.absolute)
                .unwrap_or_default(),
        }
    }

    /// Produce the metadata record for an assembled sector or lost slot.
    pub fn bind(&mut self, assembled: &AssembledSector, c1: CodewordCounts, c2: CodewordCounts) -> SectorMetadata {
        match assembled {
            AssembledSector::Sector(sector) => self.bind_sector(sector, c1, c2),
            AssembledSector::Lost { address } => self.bind_lost(*address, c1, c2),
        }
    }

    pub fn bind_sector(&mut self, sector: &Sector, c1: CodewordCounts, c2: CodewordCounts) -> SectorMetadata {
        let (address, source, q) = match sector.address {
            Some(address) => match self.find_q(address) {
                Some(q) => (address, AddressSource::Both, Some(q)),
                None => (address, AddressSource::Header, None),
            },
            None => (self.interpolate(), AddressSource::Interpolated, None),
        };
        log::trace!("MetadataSink: sector {} bound from {}", address, source);
        self.last_address = Some(address);

        SectorMetadata {
            address,
            mode: Some(sector.mode),
            status: sector.status,
            c1,
            c2,
            source,
            q,
        }
    }

    pub fn bind_lost(&mut self, address: Option<TrackTime>, c1: CodewordCounts, c2: CodewordCounts) -> SectorMetadata {
        let address = address.unwrap_or_else(|| self.interpolate());
        self.last_address = Some(address);

        SectorMetadata {
            address,
            mode: None,
            status: SectorStatus::Lost,
            c1,
            c2,
            source: AddressSource::Interpolated,
            q: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sector::{SectorBuilder, SECTOR_SIZE};

    fn sector_at(index: u32) -> Sector {
        let data = SectorBuilder::new(TrackTime::from_index(index)).build(&[]).unwrap();
        Sector::from_raw(Box::new(data), vec![false; SECTOR_SIZE], false)
    }

    fn q_at(index: u32) -> QChannel {
        QChannel::position(4, 1, 1, TrackTime::from_index(index - 150), TrackTime::from_index(index))
    }

    #[test]
    fn test_binding_sources() {
        let mut sink = MetadataSink::new();
        let none = CodewordCounts::default();
        sink.push_q(&q_at(150));
        sink.push_q(&q_at(151));

        let meta = sink.bind_sector(&sector_at(150), none, none);
        assert_eq!(meta.source, AddressSource::Both);
        assert_eq!(meta.q.map(|q| q.track), Some(1));

        let meta = sink.bind_sector(&sector_at(160), none, none);
        assert_eq!(meta.source, AddressSource::Header);

        let mut bad = sector_at(161);
        bad.address = None;
        bad.status = SectorStatus::Bad;
        let meta = sink.bind_sector(&bad, none, none);
        assert_eq!(meta.source, AddressSource::Interpolated);
        assert_eq!(meta.address, TrackTime::from_index(161));
    }

    #[test]
    fn test_invalid_q_ignored() {
        let mut sink = MetadataSink::new();
        let mut raw = q_at(150).raw;
        raw[11] ^= 1;
        sink.push_q(&QChannel::from_raw(raw));
        let none = CodewordCounts::default();
        let meta = sink.bind_sector(&sector_at(150), none, none);
        assert_eq!(meta.source, AddressSource::Header);
    }

    #[test]
    fn test_line_format() {
        let mut sink = MetadataSink::new();
        let c1 = CodewordCounts {
            passed:    97,
            corrected: 1,
            failed:    0,
        };
        let c2 = CodewordCounts {
            passed:    98,
            corrected: 0,
            failed:    0,
        };
        let meta = sink.bind_sector(&sector_at(150), c1, c2);
        assert_eq!(meta.line(), "00:02:00,1,ok,97/1/0,98/0/0");

        let lost = sink.bind_lost(None, CodewordCounts::default(), CodewordCounts::default());
        assert_eq!(lost.line(), "00:02:01,-,lost,0/0/0,0/0/0");
    }
}
