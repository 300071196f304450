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

//! The encoding side of the pipeline: sectors and subcode in, channel bits out.
//!
//! [ChannelEncoder] runs F1 frames through the [CircEncoder] and pairs each resulting F2 frame
//! with a subcode symbol to form an F3 frame. The F3 frames can then be modulated to channel
//! bits with [modulate] or written as framed records with [framed_records].

pub use crate::{
    circ::encoder::CircEncoder,
    efm::modulator::EfmModulator,
    sector::SectorBuilder,
    subcode::SubcodeBlock,
};

use crate::{
    circ::{c2::C2_ROW_DELAY, f1::PAIR_DELAY},
    pipeline::FramedF3Record,
    sector::SECTOR_SIZE,
    subcode::{QChannel, SUBCODE_BLOCK_LEN},
    types::frames::{F3Frame, C1_DATA_BYTES},
    EfmResult,
    F1_FRAME_BYTES,
};
use binrw::BinWrite;
use std::io::Cursor;

/// Return the F2 frame index and byte position that carry byte `byte` of F1 frame `f1_frame`,
/// for a stream encoded from its first frame by a [ChannelEncoder].
pub fn f2_location(f1_frame: usize, byte: usize) -> (usize, usize) {
    let pair_delay = if byte % 2 == 0 { PAIR_DELAY } else { 0 };
    let row_delay = C2_ROW_DELAY * (C1_DATA_BYTES - 1 - byte);
    (f1_frame + pair_delay + row_delay, byte)
}

pub struct ChannelEncoder {
    circ: CircEncoder,
    block: SubcodeBlock,
    position: usize,
    frames: Vec<F3Frame>,
}

impl Default for ChannelEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelEncoder {
    pub fn new() -> Self {
        Self {
            circ: CircEncoder::new(),
            block: SubcodeBlock::from_q(&QChannel::from_raw([0; 12])),
            position: 0,
            frames: Vec::new(),
        }
    }

    /// Start a new subcode block. Frames pushed from here take their subcode symbols from a
    /// block carrying `q`, or from an empty block.
    pub fn start_block(&mut self, q: Option<&QChannel>) {
        self.block = match q {
            Some(q) => SubcodeBlock::from_q(q),
            None => SubcodeBlock::from_q(&QChannel::from_raw([0; 12])),
        };
        self.position = 0;
    }

    /// Encode one F1 frame.
    pub fn push_f1(&mut self, data: &[u8; F1_FRAME_BYTES]) {
        if self.position == SUBCODE_BLOCK_LEN {
            self.start_block(None);
        }
        let payload = self.circ.encode(data);
        let (header, subcode) = self.block.frame_symbol(self.position);
        let mut frame = F3Frame::with_header(header, payload);
        frame.subcode = subcode;
        self.frames.push(frame);
        self.position += 1;
    }

    /// Encode a complete sector as 98 F1 frames, in a subcode block of its own.
    pub fn push_sector(&mut self, sector: &[u8; SECTOR_SIZE], q: Option<&QChannel>) {
        self.start_block(q);
        for chunk in sector.chunks_exact(F1_FRAME_BYTES) {
            let mut data = [0u8; F1_FRAME_BYTES];
            data.copy_from_slice(chunk);
            self.push_f1(&data);
        }
    }

    /// Encode `count` zero F1 frames.
    pub fn push_padding(&mut self, count: usize) {
        for _ in 0..count {
            self.push_f1(&[0; F1_FRAME_BYTES]);
        }
    }

    /// Encode enough zero frames to push every byte already encoded out of the CIRC delays.
    pub fn flush(&mut self) {
        self.push_padding(C2_ROW_DELAY * (C1_DATA_BYTES - 1) + PAIR_DELAY);
    }

    pub fn frames(&self) -> &[F3Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<F3Frame> {
        self.frames
    }
}

/// Modulate F3 frames to channel bits packed MSB-first.
pub fn modulate(frames: &[F3Frame]) -> Vec<u8> {
    let mut modulator = EfmModulator::new();
    for frame in frames.iter() {
        modulator.push_frame(frame);
    }
    modulator.finish();
    modulator.to_bytes()
}

/// Write F3 frames as framed records. Sync headers and erasures are not represented.
pub fn framed_records(frames: &[F3Frame]) -> EfmResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    for frame in frames.iter() {
        FramedF3Record {
            subcode: frame.subcode,
            payload: frame.payload,
        }
        .write(&mut cursor)?;
    }
    Ok(cursor.into_inner())
}
