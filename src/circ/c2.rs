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

//! The C2 deinterleaver and the RS(28,24) C2 decoder.
//!
//! The deinterleaver owns the 28-row cross-interleave delay line. Row `i` of each C1 frame is
//! read back 4·i frames after it was written, so each C2 codeword gathers its symbols from 28
//! different C1 frames.

use crate::{
    circ::{delay_line::DelayLine, reed_solomon::C2Code, CodewordCounts},
    pipeline::stage::{Stage, StageQueue},
    types::{
        enums::CodewordStatus,
        frames::{C1Frame, C2Frame, C1_DATA_BYTES, C2_DATA_BYTES},
    },
};

/// Frame delay between successive rows of the cross-interleave.
pub const C2_ROW_DELAY: usize = 4;
/// The longest row delay, and the number of frames needed to fill the delay line.
pub const C2_MAX_DELAY: usize = C2_ROW_DELAY * (C1_DATA_BYTES - 1);

/// A C2 codeword gathered by the deinterleaver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct C2Codeword {
    pub symbols:  [u8; C1_DATA_BYTES],
    pub erasures: [bool; C1_DATA_BYTES],
}

pub struct C2Deinterleaver {
    line: DelayLine<C1_DATA_BYTES>,
    out:  StageQueue<C2Codeword>,
}

impl Default for C2Deinterleaver {
    fn default() -> Self {
        Self::new()
    }
}

impl C2Deinterleaver {
    pub fn new() -> Self {
        Self {
            // Reads from before the first push are zero and erased.
            line: DelayLine::ascending(C2_ROW_DELAY, (0x00, true)),
            out:  StageQueue::new(C2_MAX_DELAY + 1),
        }
    }

    /// Return true once every row of the delay line holds real data.
    pub fn is_primed(&self) -> bool {
        self.line.is_primed()
    }

    fn push_symbols(&mut self, symbols: &[u8; C1_DATA_BYTES], erasures: &[bool; C1_DATA_BYTES]) {
        let (symbols, erasures) = self.line.push(symbols, erasures);
        self.out.push(C2Codeword { symbols, erasures });
    }

    pub fn reset(&mut self) {
        self.line.reset();
        self.out.clear();
    }
}

impl Stage for C2Deinterleaver {
    type Input = C1Frame;
    type Output = C2Codeword;

    fn push(&mut self, input: C1Frame) {
        self.push_symbols(&input.data, &input.erasures);
    }

    fn pull(&mut self) -> Option<C2Codeword> {
        self.out.pop()
    }

    /// Push erased zero frames until every row has been drained.
    fn flush(&mut self) {
        for _ in 0..C2_MAX_DELAY {
            self.push_symbols(&[0; C1_DATA_BYTES], &[true; C1_DATA_BYTES]);
        }
    }
}

pub struct C2Decoder {
    code:   C2Code,
    out:    StageQueue<C2Frame>,
    counts: CodewordCounts,
}

impl Default for C2Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl C2Decoder {
    pub fn new() -> Self {
        Self {
            code:   C2Code::new(),
            out:    StageQueue::new(1),
            counts: CodewordCounts::default(),
        }
    }

    /// Decode a single C2 codeword.
    pub fn decode(&mut self, codeword: &C2Codeword) -> C2Frame {
        let mut symbols = codeword.symbols;
        let status = self.code.decode(&mut symbols, &codeword.erasures);
        self.counts.record(status);

        let mut data = [0u8; C2_DATA_BYTES];
        data.copy_from_slice(&symbols[..C2_DATA_BYTES]);
        let errors = match status {
            CodewordStatus::Failed => [true; C2_DATA_BYTES],
            _ => [false; C2_DATA_BYTES],
        };
        C2Frame { data, errors, status }
    }

    pub fn counts(&self) -> CodewordCounts {
        self.counts
    }
}

impl Stage for C2Decoder {
    type Input = C2Codeword;
    type Output = C2Frame;

    fn push(&mut self, input: C2Codeword) {
        let frame = self.decode(&input);
        self.out.push(frame);
    }

    fn pull(&mut self) -> Option<C2Frame> {
        self.out.pop()
    }

    fn flush(&mut self) {}
}
