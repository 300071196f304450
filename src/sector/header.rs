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

//! The four-byte sector header that follows the sync pattern: a BCD address and the mode byte.

use crate::{types::msf::TrackTime, EfmResult};
use binrw::{binrw, BinRead, BinWrite};
use std::io::Cursor;

/// Offset of the header within a sector.
pub const HEADER_OFFSET: usize = 12;
/// Length of the header in bytes.
pub const HEADER_LEN: usize = 4;

#[binrw]
#[brw(big)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SectorHeader {
    pub minute: u8,
    pub second: u8,
    pub frame:  u8,
    pub mode:   u8,
}

impl SectorHeader {
    pub fn new(address: TrackTime, mode: u8) -> Self {
        let [minute, second, frame] = address.to_bcd();
        SectorHeader {
            minute,
            second,
            frame,
            mode,
        }
    }

    /// Read the header from the bytes of a sector.
    pub fn from_sector(sector: &[u8]) -> EfmResult<Self> {
        let mut cursor = Cursor::new(sector);
        cursor.set_position(HEADER_OFFSET as u64);
        Ok(SectorHeader::read(&mut cursor)?)
    }

    /// Write the header into the bytes of a sector.
    pub fn write_to(&self, sector: &mut [u8]) -> EfmResult<()> {
        let mut cursor = Cursor::new(sector);
        cursor.set_position(HEADER_OFFSET as u64);
        self.write(&mut cursor)?;
        Ok(())
    }

    /// The address carried by the header, or `None` if any field is not valid BCD or is out of
    /// range.
    pub fn address(&self) -> Option<TrackTime> {
        TrackTime::from_bcd([self.minute, self.second, self.frame])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut sector = [0u8; 32];
        let header = SectorHeader::new(TrackTime::new(12, 34, 56).unwrap(), 1);
        header.write_to(&mut sector).unwrap();
        assert_eq!(sector[12..16], [0x12, 0x34, 0x56, 0x01]);

        let read = SectorHeader::from_sector(&sector).unwrap();
        assert_eq!(read, header);
        assert_eq!(read.address(), TrackTime::new(12, 34, 56));
    }

    #[test]
    fn test_invalid_bcd() {
        let header = SectorHeader {
            minute: 0x00,
            second: 0x6A,
            frame:  0x00,
            mode:   1,
        };
        assert_eq!(header.address(), None);
    }

    #[test]
    fn test_short_buffer() {
        assert!(SectorHeader::from_sector(&[0u8; 14]).is_err());
    }
}
