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

//! Frame structures passed between pipeline stages.
//!
//! Each frame carries one flag per symbol. An F3 or F2 erasure flag marks a symbol whose value
//! is unknown; a C2 or F1 error flag marks a byte that could not be recovered.

use crate::{
    types::{
        enums::{CodewordStatus, SyncHeader},
        flags::FrameFlags,
    },
    F1_FRAME_BYTES,
};

/// The number of payload symbols in an F3 (and F2) frame.
pub const F3_PAYLOAD_BYTES: usize = 32;
/// The number of symbols in a C1 codeword after its parity has been removed.
pub const C1_DATA_BYTES: usize = 28;
/// The number of symbols in a C2 codeword after its parity has been removed.
pub const C2_DATA_BYTES: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct F3Frame {
    pub header: SyncHeader,
    pub subcode: u8,
    pub subcode_erased: bool,
    pub payload: [u8; F3_PAYLOAD_BYTES],
    pub erasures: [bool; F3_PAYLOAD_BYTES],
    pub flags: FrameFlags,
}

impl Default for F3Frame {
    fn default() -> Self {
        Self {
            header: SyncHeader::None,
            subcode: 0,
            subcode_erased: false,
            payload: [0; F3_PAYLOAD_BYTES],
            erasures: [false; F3_PAYLOAD_BYTES],
            flags: FrameFlags::empty(),
        }
    }
}

impl F3Frame {
    /// Create an F3 frame from a subcode byte and 32 payload bytes, with no erasures.
    pub fn new(subcode: u8, payload: [u8; F3_PAYLOAD_BYTES]) -> Self {
        Self {
            subcode,
            payload,
            ..Default::default()
        }
    }

    /// Create an F3 frame carrying the given sync header in its subcode position.
    pub fn with_header(header: SyncHeader, payload: [u8; F3_PAYLOAD_BYTES]) -> Self {
        Self {
            header,
            payload,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_sync_predicted(&self) -> bool {
        self.flags.contains(FrameFlags::SYNC_PREDICTED)
    }

    /// Return the number of erased payload symbols.
    pub fn erasure_count(&self) -> usize {
        self.erasures.iter().filter(|&&e| e).count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct F2Frame {
    pub data: [u8; F3_PAYLOAD_BYTES],
    pub erasures: [bool; F3_PAYLOAD_BYTES],
}

impl F2Frame {
    pub fn new(data: [u8; F3_PAYLOAD_BYTES]) -> Self {
        Self {
            data,
            erasures: [false; F3_PAYLOAD_BYTES],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct C1Frame {
    pub data: [u8; C1_DATA_BYTES],
    pub erasures: [bool; C1_DATA_BYTES],
    pub status: CodewordStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct C2Frame {
    pub data: [u8; C2_DATA_BYTES],
    pub errors: [bool; C2_DATA_BYTES],
    pub status: CodewordStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct F1Frame {
    pub data: [u8; F1_FRAME_BYTES],
    pub errors: [bool; F1_FRAME_BYTES],
    pub flags: FrameFlags,
}

impl F1Frame {
    /// Return true if the C2 decoder repaired any byte of this frame.
    #[inline]
    pub fn is_c2_corrected(&self) -> bool {
        self.flags.contains(FrameFlags::C2_CORRECTED)
    }

    #[inline]
    pub fn is_lead_in(&self) -> bool {
        self.flags.contains(FrameFlags::LEAD_IN)
    }

    /// Return true if any byte of this frame is flagged as errored.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|&e| e)
    }
}
