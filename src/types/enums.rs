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

use std::fmt::{self, Display, Formatter};

/// The outcome of decoding a single Reed-Solomon codeword.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodewordStatus {
    /// The codeword had zero syndromes. Any erasure flags were cleared.
    #[default]
    Passed,
    /// The codeword was corrected. The count is the number of symbols changed.
    Corrected(u8),
    /// The codeword could not be corrected. Every data symbol is flagged.
    Failed,
}

impl CodewordStatus {
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, CodewordStatus::Failed)
    }

    #[inline]
    pub fn is_corrected(&self) -> bool {
        matches!(self, CodewordStatus::Corrected(_))
    }
}

impl Display for CodewordStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            CodewordStatus::Passed => write!(f, "passed"),
            CodewordStatus::Corrected(n) => write!(f, "corrected({})", n),
            CodewordStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The sync header carried in the subcode symbol position of an F3 frame.
/// Frames 0 and 1 of every subcode block carry the S0 and S1 patterns instead of a data byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SyncHeader {
    #[default]
    None,
    Sync0,
    Sync1,
}

/// The state of the bit delineator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DelineatorState {
    /// Scanning every bit position for a sync pattern.
    #[default]
    Searching,
    /// A single sync has been seen; waiting for a second sync exactly one frame later.
    PreSync,
    /// Frames are being emitted on a stable cadence.
    Locked,
    /// The most recent expected sync was missing; frames are emitted on the predicted cadence.
    Slipping,
}

/// The mode byte of a sector header.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SectorMode {
    Mode0,
    Mode1,
    Mode2,
    Unknown(u8),
}

impl From<u8> for SectorMode {
    fn from(byte: u8) -> Self {
        match byte {
            0 => SectorMode::Mode0,
            1 => SectorMode::Mode1,
            2 => SectorMode::Mode2,
            _ => SectorMode::Unknown(byte),
        }
    }
}

impl From<SectorMode> for u8 {
    fn from(mode: SectorMode) -> Self {
        match mode {
            SectorMode::Mode0 => 0,
            SectorMode::Mode1 => 1,
            SectorMode::Mode2 => 2,
            SectorMode::Unknown(byte) => byte,
        }
    }
}

impl Display for SectorMode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// The final disposition of a sector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "kebab-case")]
pub enum SectorStatus {
    /// The sector was received intact.
    #[default]
    Ok,
    /// The sector was repaired by C2 or by the sector's own P/Q ECC.
    Corrected,
    /// A Mode 1 sector failed its EDC check and could not be repaired.
    EdcFail,
    /// The sector carries flagged bytes, an unknown mode or an unusable header.
    Bad,
    /// The sector was never received. No image bytes are produced.
    Lost,
}

impl SectorStatus {
    /// Returns true if the sector should be counted against a bad-sector budget.
    pub fn is_bad(&self) -> bool {
        matches!(self, SectorStatus::EdcFail | SectorStatus::Bad | SectorStatus::Lost)
    }

    /// Returns true if image bytes are written for a sector with this status.
    pub fn has_data(&self) -> bool {
        !matches!(self, SectorStatus::Lost)
    }
}

/// Where the reported address of a sector came from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "kebab-case")]
pub enum AddressSource {
    /// The sector header agreed with a recent valid subcode Q block.
    Both,
    /// The sector header was valid but no matching Q block was seen.
    Header,
    /// The sector header was unusable; the address follows the previous sector.
    #[default]
    Interpolated,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_status_display() {
        let names: Vec<String> = SectorStatus::iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["ok", "corrected", "edc-fail", "bad", "lost"]);
    }

    #[test]
    fn test_sector_mode() {
        assert_eq!(SectorMode::from(1), SectorMode::Mode1);
        assert_eq!(SectorMode::from(7), SectorMode::Unknown(7));
        assert_eq!(SectorMode::Mode2.to_string(), "2");
    }

    #[test]
    fn test_codeword_status_display() {
        assert_eq!(CodewordStatus::Corrected(2).to_string(), "corrected(2)");
        assert!(CodewordStatus::Failed.is_failed());
    }
}
