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

//! The CIRC encoder, the inverse of [super::CircDecoder].
//!
//! Each F1 frame is scrambled, its even bytes are delayed two frames, C2 parity is added, the
//! 28 C2 symbols are interleaved with row delays of 4·(27-i) frames and finally C1 parity is
//! added to produce an F2 frame. Delay lines start out filled with zeros.

use crate::{
    circ::{
        c2::C2_ROW_DELAY,
        delay_line::DelayLine,
        f1::PAIR_DELAY,
        reed_solomon::{C1Code, C2Code},
        scrambler::Scrambler,
    },
    types::frames::{C1_DATA_BYTES, F3_PAYLOAD_BYTES},
    F1_FRAME_BYTES,
};

pub struct CircEncoder {
    scrambler:  Scrambler,
    pair:       DelayLine<F1_FRAME_BYTES>,
    c2:         C2Code,
    interleave: DelayLine<C1_DATA_BYTES>,
    c1:         C1Code,
}

impl Default for CircEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircEncoder {
    pub fn new() -> Self {
        Self {
            scrambler:  Scrambler::new(),
            pair:       DelayLine::new(std::array::from_fn(|i| if i % 2 == 0 { PAIR_DELAY } else { 0 }), (0, false)),
            c2:         C2Code::new(),
            interleave: DelayLine::descending(C2_ROW_DELAY, (0, false)),
            c1:         C1Code::new(),
        }
    }

    /// Encode one F1 frame into one F2 frame.
    pub fn encode(&mut self, frame: &[u8; F1_FRAME_BYTES]) -> [u8; F3_PAYLOAD_BYTES] {
        let mut data = *frame;
        self.scrambler.apply(&mut data);

        let (paired, _) = self.pair.push(&data, &[false; F1_FRAME_BYTES]);

        let mut c2_codeword = [0u8; C1_DATA_BYTES];
        c2_codeword[..F1_FRAME_BYTES].copy_from_slice(&paired);
        self.c2.encode(&mut c2_codeword);

        let (interleaved, _) = self.interleave.push(&c2_codeword, &[false; C1_DATA_BYTES]);

        let mut f2 = [0u8; F3_PAYLOAD_BYTES];
        f2[..C1_DATA_BYTES].copy_from_slice(&interleaved);
        self.c1.encode(&mut f2);
        f2
    }
}
