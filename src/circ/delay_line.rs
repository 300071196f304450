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

//! A [DelayLine] is a ring of frames in which each row (symbol position) is read back a fixed
//! number of frames after it was written. It implements every interleaving delay in CIRC: the
//! 4·i row delays of the C2 deinterleaver, the 4·(27-i) delays of the matching interleaver and
//! the two-frame byte delays on either side of the scrambler.
//!
//! Reads that reach back before the first push return a fill value, with its own flag.

/// A multi-row delay line. Each row carries a symbol and a flag.
#[derive(Clone)]
pub struct DelayLine<const ROWS: usize> {
    delays:  [usize; ROWS],
    depth:   usize,
    symbols: Vec<[u8; ROWS]>,
    flags:   Vec<[bool; ROWS]>,
    head:    usize,
    pushed:  usize,
    fill:    (u8, bool),
}

impl<const ROWS: usize> DelayLine<ROWS> {
    /// Create a new [DelayLine] with the given per-row delays, in frames. `fill` is the symbol
    /// and flag returned for reads from before the first push.
    pub fn new(delays: [usize; ROWS], fill: (u8, bool)) -> Self {
        let depth = delays.iter().copied().max().unwrap_or(0) + 1;
        DelayLine {
            delays,
            depth,
            symbols: vec![[0; ROWS]; depth],
            flags: vec![[false; ROWS]; depth],
            head: 0,
            pushed: 0,
            fill,
        }
    }

    /// Create a [DelayLine] where row `i` is delayed by `step * i` frames.
    pub fn ascending(step: usize, fill: (u8, bool)) -> Self {
        Self::new(std::array::from_fn(|i| step * i), fill)
    }

    /// Create a [DelayLine] where row `i` is delayed by `step * (ROWS - 1 - i)` frames.
    pub fn descending(step: usize, fill: (u8, bool)) -> Self {
        Self::new(std::array::from_fn(|i| step * (ROWS - 1 - i)), fill)
    }

    /// Return the longest delay of any row.
    #[inline]
    pub fn max_delay(&self) -> usize {
        self.depth - 1
    }

    /// Return true once every row reads real data rather than the fill value.
    #[inline]
    pub fn is_primed(&self) -> bool {
        self.pushed >= self.max_delay()
    }

    /// Return the number of frames pushed since creation or the last reset.
    #[inline]
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Write one frame into the line and return the delayed frame read out alongside it.
    pub fn push(&mut self, symbols: &[u8; ROWS], flags: &[bool; ROWS]) -> ([u8; ROWS], [bool; ROWS]) {
        self.symbols[self.head] = *symbols;
        self.flags[self.head] = *flags;

        let mut out_symbols = [self.fill.0; ROWS];
        let mut out_flags = [self.fill.1; ROWS];
        for row in 0..ROWS {
            let delay = self.delays[row];
            if delay <= self.pushed {
                let idx = (self.head + self.depth - delay) % self.depth;
                out_symbols[row] = self.symbols[idx][row];
                out_flags[row] = self.flags[idx][row];
            }
        }

        self.head = (self.head + 1) % self.depth;
        self.pushed = self.pushed.saturating_add(1);
        (out_symbols, out_flags)
    }

    /// Forget all buffered frames.
    pub fn reset(&mut self) {
        self.head = 0;
        self.pushed = 0;
    }
}
