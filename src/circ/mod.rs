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

//! The Cross-Interleaved Reed-Solomon Code (CIRC).
//!
//! [CircDecoder] chains the C1 decoder, the C2 deinterleaver, the C2 decoder and the F1
//! deinterleaver/descrambler into a single stage that consumes F2 frames and produces F1 frames.
//! [encoder::CircEncoder] performs the inverse.
//!
//! The C2 delay line takes 108 frames to fill. The C2 results produced while it fills are
//! discarded, so while pushing, the decoder emits one F1 frame per F2 frame once 108 frames have
//! gone in; [Stage::flush] drains the remaining 108. The first two F1 frames are lead-in frames
//! produced while the odd-byte pair delay fills.

pub mod c1;
pub mod c2;
pub mod delay_line;
pub mod encoder;
pub mod f1;
pub mod gf;
pub mod reed_solomon;
pub mod scrambler;

use crate::{
    pipeline::stage::{Stage, StageQueue},
    types::{
        enums::CodewordStatus,
        frames::{F1Frame, F2Frame},
    },
};
use std::fmt::{self, Display, Formatter};

use c1::C1Decoder;
use c2::{C2Codeword, C2Decoder, C2Deinterleaver, C2_MAX_DELAY};
use f1::F1Deinterleaver;

/// Running totals of codeword outcomes for one decoder.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodewordCounts {
    pub passed:    u64,
    pub corrected: u64,
    pub failed:    u64,
}

impl CodewordCounts {
    pub fn record(&mut self, status: CodewordStatus) {
        match status {
            CodewordStatus::Passed => self.passed += 1,
            CodewordStatus::Corrected(_) => self.corrected += 1,
            CodewordStatus::Failed => self.failed += 1,
        }
    }

    /// Return the counts accumulated since `earlier` was taken.
    pub fn since(&self, earlier: &CodewordCounts) -> CodewordCounts {
        CodewordCounts {
            passed:    self.passed.saturating_sub(earlier.passed),
            corrected: self.corrected.saturating_sub(earlier.corrected),
            failed:    self.failed.saturating_sub(earlier.failed),
        }
    }

    pub fn total(&self) -> u64 {
        self.passed + self.corrected + self.failed
    }
}

impl Display for CodewordCounts {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}", self.passed, self.corrected, self.failed)
    }
}

/// The complete CIRC decoding stage, from F2 frames to F1 frames.
pub struct CircDecoder {
    c1: C1Decoder,
    deinterleaver: C2Deinterleaver,
    c2: C2Decoder,
    f1: F1Deinterleaver,
    c2_inputs: usize,
    out: StageQueue<F1Frame>,
}

impl Default for CircDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircDecoder {
    pub fn new() -> Self {
        Self {
            c1: C1Decoder::new(),
            deinterleaver: C2Deinterleaver::new(),
            c2: C2Decoder::new(),
            f1: F1Deinterleaver::new(),
            c2_inputs: 0,
            out: StageQueue::new(C2_MAX_DELAY + 1),
        }
    }

    pub fn c1_counts(&self) -> CodewordCounts {
        self.c1.counts()
    }

    pub fn c2_counts(&self) -> CodewordCounts {
        self.c2.counts()
    }

    fn drain_deinterleaver(&mut self) {
        while let Some(codeword) = self.deinterleaver.pull() {
            self.route_codeword(codeword);
        }
    }

    fn route_codeword(&mut self, codeword: C2Codeword) {
        self.c2_inputs += 1;
        if self.c2_inputs <= C2_MAX_DELAY {
            // Still filling the delay line.
            return;
        }
        self.c2.push(codeword);
        while let Some(c2_frame) = self.c2.pull() {
            self.f1.push(c2_frame);
        }
        while let Some(f1_frame) = self.f1.pull() {
            log::trace!("CircDecoder: F1 frame flags {:?}", f1_frame.flags);
            self.out.push(f1_frame);
        }
    }

    /// Discard every buffered frame and restart as if newly created.
    pub fn reset(&mut self) {
        self.deinterleaver.reset();
        self.f1.reset();
        self.c2_inputs = 0;
        self.out.clear();
    }
}

impl Stage for CircDecoder {
    type Input = F2Frame;
    type Output = F1Frame;

    fn push(&mut self, input: F2Frame) {
        self.c1.push(input);
        while let Some(c1_frame) = self.c1.pull() {
            self.deinterleaver.push(c1_frame);
        }
        self.drain_deinterleaver();
    }

    fn pull(&mut self) -> Option<F1Frame> {
        self.out.pop()
    }

    fn flush(&mut self) {
        self.deinterleaver.flush();
        self.drain_deinterleaver();
        self.f1.flush();
        while let Some(f1_frame) = self.f1.pull() {
            self.out.push(f1_frame);
        }
    }
}
