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

//! Builds complete 2352-byte sectors for a given address and mode.

use crate::{
    sector::{
        ecc::generate_ecc,
        edc::edc,
        header::SectorHeader,
        DATA_OFFSET,
        EDC_OFFSET,
        MODE1_USER_LEN,
        MODE2_USER_LEN,
        SECTOR_SIZE,
        SECTOR_SYNC,
    },
    types::{enums::SectorMode, msf::TrackTime},
    EfmError,
    EfmResult,
};

#[derive(Copy, Clone, Debug)]
pub struct SectorBuilder {
    address: TrackTime,
    mode: SectorMode,
}

impl SectorBuilder {
    /// Create a builder for a Mode 1 sector at `address`.
    pub fn new(address: TrackTime) -> Self {
        SectorBuilder {
            address,
            mode: SectorMode::Mode1,
        }
    }

    pub fn mode(mut self, mode: SectorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn address(mut self, address: TrackTime) -> Self {
        self.address = address;
        self
    }

    /// Build the sector. `user` is zero-padded to the mode's user area; Mode 0 sectors accept
    /// no user data.
    pub fn build(&self, user: &[u8]) -> EfmResult<[u8; SECTOR_SIZE]> {
        let capacity = match self.mode {
            SectorMode::Mode0 => 0,
            SectorMode::Mode1 => MODE1_USER_LEN,
            SectorMode::Mode2 => MODE2_USER_LEN,
            SectorMode::Unknown(mode) => {
                return Err(EfmError::ParameterError(format!("Can't build a sector of mode {}", mode)));
            }
        };
        if user.len() > capacity {
            return Err(EfmError::ParameterError(format!(
                "{} bytes of user data exceeds the {} byte capacity of a mode {} sector",
                user.len(),
                capacity,
                self.mode
            )));
        }

        let mut sector = [0u8; SECTOR_SIZE];
        sector[..SECTOR_SYNC.len()].copy_from_slice(&SECTOR_SYNC);
        SectorHeader::new(self.address, self.mode.into()).write_to(&mut sector)?;
        sector[DATA_OFFSET..DATA_OFFSET + user.len()].copy_from_slice(user);

        if self.mode == SectorMode::Mode1 {
            let edc = edc(&sector[..EDC_OFFSET]);
            sector[EDC_OFFSET..EDC_OFFSET + 4].copy_from_slice(&edc.to_le_bytes());
            generate_ecc(&mut sector);
        }
        Ok(sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sector::ecc::{P_PARITY_OFFSET, Q_PARITY_OFFSET};
    use sha1::{Digest, Sha1};

    #[test]
    fn test_empty_mode1_reference() {
        // An empty Mode 1 sector at 00:02:14, as read from a pressed disc.
        let sector = SectorBuilder::new(TrackTime::new(0, 2, 14).unwrap())
            .build(&[])
            .unwrap();

        assert_eq!(sector[12..16], [0x00, 0x02, 0x14, 0x01]);
        assert_eq!(sector[EDC_OFFSET..EDC_OFFSET + 4], [0x9E, 0xDC, 0x20, 0x94]);
        assert_eq!(sector[P_PARITY_OFFSET..P_PARITY_OFFSET + 4], [0x00, 0xF7, 0x18, 0xF5]);
        assert_eq!(sector[Q_PARITY_OFFSET..Q_PARITY_OFFSET + 2], [0x00, 0x41]);

        let mut hasher = Sha1::new();
        hasher.update(&sector[..]);
        assert_eq!(
            hex::encode(hasher.finalize()),
            "ab6d2614a87e0e52135488617db52e026ae3c5b1"
        );
    }

    #[test]
    fn test_capacity() {
        let builder = SectorBuilder::new(TrackTime::default());
        assert!(builder.build(&[0; MODE1_USER_LEN + 1]).is_err());
        assert!(builder.mode(SectorMode::Mode0).build(&[1]).is_err());
        assert!(builder.mode(SectorMode::Unknown(3)).build(&[]).is_err());
        assert!(builder.mode(SectorMode::Mode2).build(&[0; MODE2_USER_LEN]).is_ok());
    }
}
