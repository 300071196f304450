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

//! The F3 splitter separates each F3 frame into its subcode symbol and its 32-byte F2 frame.
//!
//! Frames whose sync was predicted rather than found are forwarded with every symbol erased.

use crate::{
    pipeline::stage::{Stage, StageQueue},
    subcode::SubcodeSymbol,
    types::frames::{F2Frame, F3Frame, F3_PAYLOAD_BYTES},
};

pub struct F3Splitter {
    f2_out:      StageQueue<F2Frame>,
    subcode_out: StageQueue<SubcodeSymbol>,
}

impl Default for F3Splitter {
    fn default() -> Self {
        Self::new()
    }
}

impl F3Splitter {
    pub fn new() -> Self {
        Self {
            f2_out:      StageQueue::new(1),
            subcode_out: StageQueue::new(1),
        }
    }

    /// Take the next subcode symbol, if any.
    pub fn pull_subcode(&mut self) -> Option<SubcodeSymbol> {
        self.subcode_out.pop()
    }
}

impl Stage for F3Splitter {
    type Input = F3Frame;
    type Output = F2Frame;

    fn push(&mut self, input: F3Frame) {
        let predicted = input.is_sync_predicted();
        let erasures = if predicted {
            [true; F3_PAYLOAD_BYTES]
        }
        else {
            input.erasures
        };

        self.subcode_out.push(SubcodeSymbol {
            header: input.header,
            value:  input.subcode,
            erased: predicted || input.subcode_erased,
        });
        self.f2_out.push(F2Frame {
            data: input.payload,
            erasures,
        });
    }

    fn pull(&mut self) -> Option<F2Frame> {
        self.f2_out.pop()
    }

    fn flush(&mut self) {}
}
