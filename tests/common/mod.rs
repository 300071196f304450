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

    tests/common/mod.rs

    Common support routines for tests
*/
#![allow(dead_code)]

use efmfox::{
    encoder::ChannelEncoder,
    prelude::*,
    sector::{SectorBuilder, SECTOR_SIZE},
    DecodeReport,
    QChannel,
    Sector,
    SectorMetadata,
    F1_FRAME_BYTES,
};

use hex::encode;
use sha1::{Digest, Sha1};
use std::{cell::RefCell, rc::Rc};

/// The number of zero F1 frames placed before the first synthesized sector.
pub const LEAD_FRAMES: usize = 4;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn compute_slice_hash(slice: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(slice);
    let result = hasher.finalize();

    encode(result)
}

/// Mode 1 user data: 0x00..0xFF repeating.
pub fn user_pattern() -> Vec<u8> {
    (0..2048usize).map(|i| i as u8).collect()
}

pub fn build_sector(index: u32) -> [u8; SECTOR_SIZE] {
    SectorBuilder::new(TrackTime::from_index(index))
        .build(&user_pattern())
        .unwrap()
}

pub fn position_q(index: u32) -> QChannel {
    QChannel::position(4, 1, 1, TrackTime::from_index(index - 150), TrackTime::from_index(index))
}

/// Encode consecutive Mode 1 sectors starting at sector `first`, preceded by [LEAD_FRAMES]
/// zero frames and followed by enough zero frames to empty the CIRC delays.
pub fn synth_frames(first: u32, count: u32) -> Vec<F3Frame> {
    let mut encoder = ChannelEncoder::new();
    encoder.push_padding(LEAD_FRAMES);
    for index in first..first + count {
        encoder.push_sector(&build_sector(index), Some(&position_q(index)));
    }
    encoder.flush();
    encoder.into_frames()
}

/// Everything a decode produced, split by kind.
#[derive(Default)]
pub struct Decoded {
    pub sectors: Vec<(Sector, SectorMetadata)>,
    pub records: Vec<SectorMetadata>,
    pub q: Vec<QChannel>,
    pub f1: Vec<F1Frame>,
    pub f1_before_finish: usize,
    pub report: DecodeReport,
}

impl Decoded {
    pub fn image(&self) -> Vec<u8> {
        self.sectors
            .iter()
            .flat_map(|(s, _)| s.as_bytes().to_vec())
            .collect()
    }
}

fn collect(decoder: &mut EfmDecoder, decoded: &mut Decoded) {
    while let Some(event) = decoder.next_event() {
        match event {
            DecodeEvent::Sector(sector, meta) => {
                decoded.records.push(meta.clone());
                decoded.sectors.push((sector, meta));
            }
            DecodeEvent::Lost(meta) => decoded.records.push(meta),
            DecodeEvent::Subcode(q) => decoded.q.push(q),
            DecodeEvent::Cancelled | DecodeEvent::Finished => {}
        }
    }
}

fn run_decoder<F: FnOnce(&mut EfmDecoder)>(feed: F) -> Decoded {
    let tapped: Rc<RefCell<Vec<F1Frame>>> = Rc::new(RefCell::new(Vec::new()));
    let tap = Rc::clone(&tapped);
    let mut decoder =
        EfmDecoder::new(DecodeOptions::default()).with_tap(Box::new(move |f: &F1Frame| tap.borrow_mut().push(f.clone())));

    let mut decoded = Decoded::default();
    feed(&mut decoder);
    collect(&mut decoder, &mut decoded);
    decoded.f1_before_finish = tapped.borrow().len();

    decoder.finish().unwrap();
    collect(&mut decoder, &mut decoded);
    decoded.report = decoder.report();
    decoded.f1 = tapped.borrow().clone();
    decoded
}

/// Decode F3 frames, entering the pipeline at the splitter.
pub fn decode_frames(frames: &[F3Frame]) -> Decoded {
    run_decoder(|decoder| {
        for frame in frames.iter() {
            decoder.push_f3(frame.clone()).unwrap();
        }
    })
}

/// Decode packed channel bits.
pub fn decode_channel(bytes: &[u8]) -> Decoded {
    run_decoder(|decoder| decoder.push_bytes(bytes).unwrap())
}

/// Split a sector into the F1 frames that carry it.
pub fn sector_f1_frames(sector: &[u8; SECTOR_SIZE]) -> Vec<[u8; F1_FRAME_BYTES]> {
    sector
        .chunks_exact(F1_FRAME_BYTES)
        .map(|c| {
            let mut frame = [0u8; F1_FRAME_BYTES];
            frame.copy_from_slice(c);
            frame
        })
        .collect()
}
