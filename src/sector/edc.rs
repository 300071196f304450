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

//! The sector error detection code: a CRC-32 with polynomial
//! x^32 + x^31 + x^16 + x^15 + x^4 + x^3 + x + 1, computed LSB-first (reflected polynomial
//! 0xD8018001) with an initial value of zero and no final XOR.

const EDC_POLY: u32 = 0xD801_8001;

const EDC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut edc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            edc = if edc & 1 != 0 { (edc >> 1) ^ EDC_POLY } else { edc >> 1 };
            bit += 1;
        }
        table[i] = edc;
        i += 1;
    }
    table
}

/// Incremental EDC hasher.
pub struct EdcHasher {
    edc: u32,
}

impl EdcHasher {
    pub fn new() -> Self {
        Self { edc: 0 }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data.iter() {
            self.edc = (self.edc >> 8) ^ EDC_TABLE[((self.edc ^ byte as u32) & 0xFF) as usize];
        }
    }

    pub fn finalize(&self) -> u32 {
        self.edc
    }
}

impl Default for EdcHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the EDC of `data`.
pub fn edc(data: &[u8]) -> u32 {
    let mut hasher = EdcHasher::new();
    hasher.update(data);
    hasher.finalize()
}
