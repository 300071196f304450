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

//! # efmfox
//!
//! efmfox recovers digital data from EFM (eight-to-fourteen modulation) channel-bit captures of
//! laserdisc and Compact Disc media. Channel bits are delineated into F3 frames, demodulated,
//! passed through the Cross-Interleaved Reed-Solomon Code (CIRC) decoders, and finally assembled
//! into 2352-byte sectors that are correlated with the subcode Q channel.
//!
//! The decoding pipeline is a chain of [Stage]s, each with an explicit `push`/`pull`/`flush`
//! interface. Most users will want the [EfmDecoder], which owns a complete pipeline, or the
//! [decode_reader] driver which feeds an [EfmDecoder] from any [std::io::Read] source.
//!
//! The inverse transforms (sector building, CIRC encoding and EFM modulation) are provided in
//! [encoder], primarily for synthesizing test material.

pub mod circ;
pub mod efm;
pub mod encoder;
pub mod metadata;
pub mod pipeline;
pub mod sector;
pub mod subcode;
pub mod types;
mod util;

use thiserror::Error;

/// The length of an F1 frame in bytes.
pub const F1_FRAME_BYTES: usize = 24;
/// The number of F3 frames making up one sector, and one subcode block.
pub const FRAMES_PER_SECTOR: usize = 98;

#[derive(Debug, Error)]
pub enum EfmError {
    #[error("An IO error occurred reading or writing a stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("A framed F3 record could not be parsed: {0}")]
    FramedRecord(String),
    #[error("The input never produced a synchronised F3 frame")]
    NeverSynchronised,
    #[error("Decoding was cancelled")]
    Cancelled,
    #[error("Invalid parameters were specified to a library function: {0}")]
    ParameterError(String),
}

impl From<binrw::Error> for EfmError {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(e) => EfmError::Io(e),
            e => EfmError::FramedRecord(e.to_string()),
        }
    }
}

pub type EfmResult<T> = Result<T, EfmError>;

pub use crate::{
    metadata::{MetadataSink, SectorMetadata},
    pipeline::{
        decode_reader,
        decode_segments,
        DecodeEvent,
        DecodeOptions,
        DecodeReport,
        EfmDecoder,
        F1Tap,
        InputFormat,
        SegmentOutput,
        Stage,
    },
    sector::{Sector, SectorAssembler, SECTOR_SIZE},
    subcode::{QChannel, SubcodeAssembler, SubcodeBlock},
    types::{
        enums::{AddressSource, CodewordStatus, DelineatorState, SectorMode, SectorStatus, SyncHeader},
        msf::TrackTime,
    },
};

pub mod prelude {
    pub use crate::{
        pipeline::{DecodeEvent, DecodeOptions, EfmDecoder, InputFormat, Stage},
        types::{
            enums::{CodewordStatus, SectorMode, SectorStatus, SyncHeader},
            frames::{C1Frame, C2Frame, F1Frame, F2Frame, F3Frame},
            msf::TrackTime,
        },
        EfmError,
        EfmResult,
    };
}
