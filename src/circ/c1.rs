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

//! The C1 decoder: RS(32,28) over each F2 frame.

use crate::{
    circ::{reed_solomon::C1Code, CodewordCounts},
    pipeline::stage::{Stage, StageQueue},
    types::{
        enums::CodewordStatus,
        frames::{C1Frame, F2Frame, C1_DATA_BYTES},
    },
};

pub struct C1Decoder {
    code:   C1Code,
    out:    StageQueue<C1Frame>,
    counts: CodewordCounts,
}

impl Default for C1Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl C1Decoder {
    pub fn new() -> Self {
        Self {
            code:   C1Code::new(),
            out:    StageQueue::new(1),
            counts: CodewordCounts::default(),
        }
    }

    /// Decode a single F2 frame.
    pub fn decode(&mut self, frame: &F2Frame) -> C1Frame {
        let mut codeword = frame.data;
        let status = self.code.decode(&mut codeword, &frame.erasures);
        self.counts.record(status);

        let mut data = [0u8; C1_DATA_BYTES];
        data.copy_from_slice(&codeword[..C1_DATA_BYTES]);
        let erasures = match status {
            CodewordStatus::Failed => {
                log::trace!("C1Decoder::decode(): codeword failed");
                [true; C1_DATA_BYTES]
            }
            _ => [false; C1_DATA_BYTES],
        };
        C1Frame { data, erasures, status }
    }

    pub fn counts(&self) -> CodewordCounts {
        self.counts
    }
}

impl Stage for C1Decoder {
    type Input = F2Frame;
    type Output = C1Frame;

    fn push(&mut self, input: F2Frame) {
        let frame = self.decode(&input);
        self.out.push(frame);
    }

    fn pull(&mut self) -> Option<C1Frame> {
        self.out.pop()
    }

    fn flush(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::frames::F3_PAYLOAD_BYTES;

    fn encoded_frame() -> F2Frame {
        let mut data = [0u8; F3_PAYLOAD_BYTES];
        for (i, b) in data.iter_mut().take(C1_DATA_BYTES).enumerate() {
            *b = (i as u8).wrapping_mul(37);
        }
        C1Code::new().encode(&mut data);
        F2Frame::new(data)
    }

    #[test]
    fn test_single_error_corrected() {
        let clean = encoded_frame();
        let mut frame = clean.clone();
        frame.data[16] ^= 0xA5;

        let mut c1 = C1Decoder::new();
        let out = c1.process(frame);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, CodewordStatus::Corrected(1));
        assert_eq!(out[0].data[..], clean.data[..C1_DATA_BYTES]);
        assert!(out[0].erasures.iter().all(|&e| !e));
        assert_eq!(c1.counts().corrected, 1);
    }

    #[test]
    fn test_burst_fails_and_erases() {
        let mut frame = encoded_frame();
        for i in 0..5 {
            frame.data[i] ^= 0x55;
            frame.erasures[i] = true;
        }
        let mut c1 = C1Decoder::new();
        let out = c1.process(frame);
        assert_eq!(out[0].status, CodewordStatus::Failed);
        assert!(out[0].erasures.iter().all(|&e| e));
        assert_eq!(c1.counts().failed, 1);
    }

    #[test]
    fn test_erased_symbols_cleared_on_pass() {
        let mut frame = encoded_frame();
        frame.erasures[7] = true;
        let out = C1Decoder::new().process(frame);
        assert_eq!(out[0].status, CodewordStatus::Passed);
        assert!(out[0].erasures.iter().all(|&e| !e));
    }
}
