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

//! Arithmetic over GF(2^8) with the primitive polynomial x^8 + x^4 + x^3 + x^2 + 1 (0x11D)
//! and generator α = 0x02. This is the field used by both CIRC codes and the CD-ROM P/Q ECC.
//!
//! The exponent and logarithm tables are computed at compile time and shared read-only.

pub const GF_POLY: u16 = 0x11D;
pub const GF_ORDER: usize = 255;

pub struct GaloisField {
    exp: [u8; 2 * GF_ORDER],
    log: [u8; 256],
}

/// The shared field instance.
pub static GF256: GaloisField = GaloisField::new();

impl GaloisField {
    pub(crate) const fn new() -> Self {
        let mut exp = [0u8; 2 * GF_ORDER];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        let mut i = 0;
        while i < GF_ORDER {
            exp[i] = x as u8;
            exp[i + GF_ORDER] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= GF_POLY;
            }
            i += 1;
        }
        Self { exp, log }
    }

    #[inline]
    pub const fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
    }

    /// Divide `a` by `b`. Division by zero yields zero; callers check their denominators.
    #[inline]
    pub const fn div(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + GF_ORDER - self.log[b as usize] as usize]
    }

    #[inline]
    pub const fn inv(&self, a: u8) -> u8 {
        self.div(1, a)
    }

    /// Return α raised to the power `e`.
    #[inline]
    pub const fn alpha_pow(&self, e: usize) -> u8 {
        self.exp[e % GF_ORDER]
    }

    /// Return the discrete logarithm of a non-zero element.
    #[inline]
    pub const fn log(&self, a: u8) -> usize {
        self.log[a as usize] as usize
    }

    /// Evaluate a polynomial stored lowest coefficient first at `x`.
    pub fn eval(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().rev().fold(0, |acc, &c| self.mul(acc, x) ^ c)
    }
}
