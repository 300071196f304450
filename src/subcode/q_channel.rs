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

//! The subcode Q channel.
//!
//! A Q block is 96 bits: 80 bits of payload followed by a big-endian CRC-16. With ADR 1 the
//! payload carries the current position: track, index, the time relative to the start of the
//! track and the absolute disc time, all in BCD.

use crate::{
    subcode::crc::crc16,
    types::msf::TrackTime,
    util::{bcd_to_u8, u8_to_bcd},
};
use std::fmt::{self, Display, Formatter};

/// The length of a Q block in bytes, including the CRC.
pub const Q_BLOCK_BYTES: usize = 12;
/// ADR value of a position block.
pub const ADR_POSITION: u8 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QChannel {
    pub control:  u8,
    pub adr:      u8,
    pub track:    u8,
    pub index:    u8,
    /// Time relative to the start of the track. Only present for position blocks.
    pub relative: Option<TrackTime>,
    /// Absolute disc time. Only present for position blocks.
    pub absolute: Option<TrackTime>,
    pub crc_ok:   bool,
    pub raw:      [u8; Q_BLOCK_BYTES],
}

impl QChannel {
    /// Parse a raw 12-byte Q block and check its CRC. An all-zero block trivially satisfies
    /// the CRC but carries no information, so it is never valid.
    pub fn from_raw(raw: [u8; Q_BLOCK_BYTES]) -> Self {
        let crc_ok = raw.iter().any(|&b| b != 0) && crc16(&raw[..10]).to_be_bytes() == raw[10..12];
        let control = raw[0] >> 4;
        let adr = raw[0] & 0x0F;

        let (relative, absolute) = if adr == ADR_POSITION {
            (
                TrackTime::from_bcd([raw[3], raw[4], raw[5]]),
                TrackTime::from_bcd([raw[7], raw[8], raw[9]]),
            )
        }
        else {
            (None, None)
        };

        QChannel {
            control,
            adr,
            track: bcd_to_u8(raw[1]).unwrap_or(raw[1]),
            index: bcd_to_u8(raw[2]).unwrap_or(raw[2]),
            relative,
            absolute,
            crc_ok,
            raw,
        }
    }

    /// Build a position (ADR 1) Q block with a valid CRC.
    pub fn position(control: u8, track: u8, index: u8, relative: TrackTime, absolute: TrackTime) -> Self {
        let mut raw = [0u8; Q_BLOCK_BYTES];
        raw[0] = (control << 4) | ADR_POSITION;
        raw[1] = u8_to_bcd(track);
        raw[2] = u8_to_bcd(index);
        raw[3..6].copy_from_slice(&relative.to_bcd());
        raw[7..10].copy_from_slice(&absolute.to_bcd());
        let crc = crc16(&raw[..10]);
        raw[10..12].copy_from_slice(&crc.to_be_bytes());
        QChannel::from_raw(raw)
    }

    /// Format a line for the Q log: `control,adr,track,index,relative,absolute,crc`.
    pub fn log_line(&self) -> String {
        let time = |t: Option<TrackTime>| t.map_or_else(|| "--:--:--".to_string(), |t| t.to_string());
        format!(
            "{},{},{},{},{},{},{}",
            self.control,
            self.adr,
            self.track,
            self.index,
            time(self.relative),
            time(self.absolute),
            if self.crc_ok { "ok" } else { "bad" }
        )
    }
}

impl Display for QChannel {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.log_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_block() {
        let q = QChannel::position(
            4,
            1,
            1,
            TrackTime::new(0, 0, 5).unwrap(),
            TrackTime::new(0, 2, 5).unwrap(),
        );
        assert!(q.crc_ok);
        assert_eq!(q.raw[0], 0x41);
        assert_eq!(q.absolute, TrackTime::new(0, 2, 5));
        assert_eq!(q.log_line(), "4,1,1,1,00:00:05,00:02:05,ok");
    }

    #[test]
    fn test_crc_law() {
        let q = QChannel::position(0, 2, 1, TrackTime::default(), TrackTime::new(3, 4, 5).unwrap());
        // Any single bit flip in the 96 bits invalidates the block.
        for bit in 0..96 {
            let mut raw = q.raw;
            raw[bit / 8] ^= 0x80 >> (bit % 8);
            assert!(!QChannel::from_raw(raw).crc_ok, "bit {}", bit);
        }
    }

    #[test]
    fn test_zero_block_invalid() {
        assert!(!QChannel::from_raw([0; Q_BLOCK_BYTES]).crc_ok);
    }
}
