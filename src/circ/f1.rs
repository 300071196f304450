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

//! F2 to F1: byte-pair deinterleave and descramble.
//!
//! Odd byte positions of each C2 output are delayed by two frames so they line up with the even
//! bytes they were paired with, then the frame is descrambled. The first two frames out of the
//! stage are lead-in frames: their odd bytes have no source yet, so the whole frame is zero and
//! flagged, and the scrambler phase does not advance for them.

use crate::{
    circ::{delay_line::DelayLine, scrambler::Scrambler},
    pipeline::stage::{Stage, StageQueue},
    types::{
        flags::FrameFlags,
        frames::{C2Frame, F1Frame},
    },
    F1_FRAME_BYTES,
};

/// Frame delay applied to odd byte positions.
pub const PAIR_DELAY: usize = 2;

pub struct F1Deinterleaver {
    line:      DelayLine<F1_FRAME_BYTES>,
    corrected: [bool; PAIR_DELAY + 1],
    scrambler: Scrambler,
    out:       StageQueue<F1Frame>,
}

impl Default for F1Deinterleaver {
    fn default() -> Self {
        Self::new()
    }
}

impl F1Deinterleaver {
    pub fn new() -> Self {
        Self {
            line:      DelayLine::new(std::array::from_fn(|i| if i % 2 == 1 { PAIR_DELAY } else { 0 }), (0, true)),
            corrected: [false; PAIR_DELAY + 1],
            scrambler: Scrambler::new(),
            out:       StageQueue::new(1),
        }
    }

    fn lead_in_frame() -> F1Frame {
        F1Frame {
            data:   [0; F1_FRAME_BYTES],
            errors: [true; F1_FRAME_BYTES],
            flags:  FrameFlags::LEAD_IN,
        }
    }

    pub fn reset(&mut self) {
        self.line.reset();
        self.corrected = [false; PAIR_DELAY + 1];
        self.scrambler.reset();
        self.out.clear();
    }
}

impl Stage for F1Deinterleaver {
    type Input = C2Frame;
    type Output = F1Frame;

    fn push(&mut self, input: C2Frame) {
        let slot = self.line.pushed() % (PAIR_DELAY + 1);
        let delayed_slot = (slot + 1) % (PAIR_DELAY + 1);
        self.corrected[slot] = input.status.is_corrected();

        let primed = self.line.is_primed();
        let (mut data, errors) = self.line.push(&input.data, &input.errors);
        if !primed {
            self.out.push(Self::lead_in_frame());
            return;
        }

        self.scrambler.apply(&mut data);

        let mut flags = FrameFlags::empty();
        if self.corrected[slot] || self.corrected[delayed_slot] {
            flags |= FrameFlags::C2_CORRECTED;
        }
        self.out.push(F1Frame { data, errors, flags });
    }

    fn pull(&mut self) -> Option<F1Frame> {
        self.out.pop()
    }

    fn flush(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{circ::scrambler::SCRAMBLE_PATTERN, types::enums::CodewordStatus};

    fn c2_frame(data: [u8; F1_FRAME_BYTES], status: CodewordStatus) -> C2Frame {
        C2Frame {
            data,
            errors: [false; F1_FRAME_BYTES],
            status,
        }
    }

    #[test]
    fn test_lead_in() {
        let mut stage = F1Deinterleaver::new();
        let out: Vec<F1Frame> = (0..3)
            .flat_map(|_| stage.process(c2_frame([0; F1_FRAME_BYTES], CodewordStatus::Passed)))
            .collect();
        assert_eq!(out.len(), 3);
        assert!(out[0].is_lead_in() && out[1].is_lead_in());
        assert!(out[0].errors.iter().all(|&e| e));
        assert!(!out[2].is_lead_in());
        assert!(!out[2].has_errors());
        // The first real frame is descrambled from phase zero.
        assert_eq!(out[2].data[..], SCRAMBLE_PATTERN[..F1_FRAME_BYTES]);
    }

    #[test]
    fn test_odd_bytes_delayed() {
        let mut stage = F1Deinterleaver::new();
        let mut out = Vec::new();
        for t in 0..4u8 {
            out.extend(stage.process(c2_frame([t; F1_FRAME_BYTES], CodewordStatus::Passed)));
        }
        // Output 3: even bytes from input 3, odd bytes from input 1. Phase is 24 for the
        // second real frame.
        let frame = &out[3];
        for i in 0..F1_FRAME_BYTES {
            let source = if i % 2 == 1 { 1 } else { 3 };
            assert_eq!(frame.data[i], source ^ SCRAMBLE_PATTERN[(F1_FRAME_BYTES + i) % 49]);
        }
    }

    #[test]
    fn test_c2_corrected_mark() {
        let mut stage = F1Deinterleaver::new();
        let statuses = [
            CodewordStatus::Passed,
            CodewordStatus::Corrected(1),
            CodewordStatus::Passed,
            CodewordStatus::Passed,
            CodewordStatus::Passed,
        ];
        let out: Vec<F1Frame> = statuses
            .iter()
            .flat_map(|&s| stage.process(c2_frame([0; F1_FRAME_BYTES], s)))
            .collect();
        // Input 1 feeds the odd bytes of output 3 only.
        assert!(!out[2].is_c2_corrected());
        assert!(out[3].is_c2_corrected());
        assert!(!out[4].is_c2_corrected());
    }
}
