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

//! Mode 1 P/Q error correction.
//!
//! The ECC protects sector bytes 12..2248 (header, user data, EDC and the zero field) as a
//! product code of two Reed-Solomon codes over GF(2^8). The P code has 86 column vectors of 24
//! data bytes; the Q code has 52 diagonal vectors of 43 bytes, which also span the P parity.
//! Each vector carries two parity bytes.
//!
//! Correction alternates P and Q passes. A vector with exactly two flagged bytes is solved as a
//! double erasure; otherwise a single error is located from the syndromes.

use crate::{circ::gf::GF256, sector::SECTOR_SIZE};

/// Offset of the first byte covered by the ECC.
pub const ECC_START: usize = 12;
/// Offset of the P parity bytes.
pub const P_PARITY_OFFSET: usize = 0x81C;
/// Offset of the Q parity bytes.
pub const Q_PARITY_OFFSET: usize = 0x8C8;

const MAX_ROUNDS: usize = 4;

/// The geometry of one of the two codes.
struct EccLayout {
    major_count: usize,
    minor_count: usize,
    major_mult: usize,
    minor_inc: usize,
    parity_offset: usize,
}

const P_LAYOUT: EccLayout = EccLayout {
    major_count: 86,
    minor_count: 24,
    major_mult: 2,
    minor_inc: 86,
    parity_offset: P_PARITY_OFFSET,
};

const Q_LAYOUT: EccLayout = EccLayout {
    major_count: 52,
    minor_count: 43,
    major_mult: 86,
    minor_inc: 88,
    parity_offset: Q_PARITY_OFFSET,
};

impl EccLayout {
    /// Return the sector offsets of vector `major`: its data bytes followed by its two parity
    /// bytes.
    fn vector(&self, major: usize) -> Vec<usize> {
        let size = self.major_count * self.minor_count;
        let mut index = (major >> 1) * self.major_mult + (major & 1);
        let mut offsets = Vec::with_capacity(self.minor_count + 2);
        for _ in 0..self.minor_count {
            offsets.push(ECC_START + index);
            index += self.minor_inc;
            if index >= size {
                index -= size;
            }
        }
        offsets.push(self.parity_offset + major);
        offsets.push(self.parity_offset + major + self.major_count);
        offsets
    }

    fn generate(&self, sector: &mut [u8; SECTOR_SIZE]) {
        for major in 0..self.major_count {
            let vector = self.vector(major);
            let (data, parity) = vector.split_at(self.minor_count);
            let mut a = 0u8;
            let mut sum = 0u8;
            for &offset in data.iter() {
                a = GF256.mul(a ^ sector[offset], 2);
                sum ^= sector[offset];
            }
            // Solve p0 + p1 = sum and α·p0 + p1 = α·(weighted data sum).
            let p0 = GF256.div(GF256.mul(a, 2) ^ sum, 3);
            sector[parity[0]] = p0;
            sector[parity[1]] = p0 ^ sum;
        }
    }

    /// Run one correction pass over every vector. Returns the number of bytes changed and the
    /// number of vectors left uncorrectable.
    fn correct(&self, sector: &mut [u8; SECTOR_SIZE], flags: &mut [bool]) -> (usize, usize) {
        let mut changed = 0;
        let mut failed = 0;
        for major in 0..self.major_count {
            let vector = self.vector(major);
            let n = vector.len();

            let mut s0 = 0u8;
            let mut s1 = 0u8;
            for (k, &offset) in vector.iter().enumerate() {
                s0 ^= sector[offset];
                s1 ^= GF256.mul(sector[offset], GF256.alpha_pow(n - 1 - k));
            }
            if s0 == 0 && s1 == 0 {
                continue;
            }

            let erased: Vec<usize> = (0..n).filter(|&k| flags[vector[k]]).collect();
            if erased.len() == 2 {
                let (ka, kb) = (erased[0], erased[1]);
                let xa = GF256.alpha_pow(n - 1 - ka);
                let xb = GF256.alpha_pow(n - 1 - kb);
                let eb = GF256.div(s1 ^ GF256.mul(s0, xa), xa ^ xb);
                let ea = s0 ^ eb;
                for (k, e) in [(ka, ea), (kb, eb)] {
                    if e != 0 {
                        sector[vector[k]] ^= e;
                        changed += 1;
                    }
                    flags[vector[k]] = false;
                }
                continue;
            }

            if s0 == 0 || s1 == 0 {
                failed += 1;
                continue;
            }
            let location = (GF256.log(s1) + 255 - GF256.log(s0)) % 255;
            if location >= n {
                failed += 1;
                continue;
            }
            let k = n - 1 - location;
            sector[vector[k]] ^= s0;
            flags[vector[k]] = false;
            changed += 1;
        }
        (changed, failed)
    }
}

/// Generate the P and Q parity of a Mode 1 sector. The header, user data and EDC must
/// already be in place.
pub fn generate_ecc(sector: &mut [u8; SECTOR_SIZE]) {
    P_LAYOUT.generate(sector);
    Q_LAYOUT.generate(sector);
}

/// The result of attempting P/Q correction on a sector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EccOutcome {
    /// Bytes changed by the correction.
    pub corrected: usize,
    /// Vectors still uncorrectable after the final pass.
    pub uncorrectable: usize,
}

/// Correct a Mode 1 sector in place using its P and Q parity. `flags` marks bytes known to be
/// bad; flags are cleared on the bytes the correction repairs.
pub fn correct_ecc(sector: &mut [u8; SECTOR_SIZE], flags: &mut [bool]) -> EccOutcome {
    let mut outcome = EccOutcome::default();
    for round in 0..MAX_ROUNDS {
        let (p_changed, _) = P_LAYOUT.correct(sector, flags);
        let (q_changed, q_failed) = Q_LAYOUT.correct(sector, flags);
        outcome.corrected += p_changed + q_changed;
        outcome.uncorrectable = q_failed;
        log::trace!(
            "correct_ecc(): round {} changed {} P, {} Q bytes",
            round,
            p_changed,
            q_changed
        );
        if p_changed + q_changed == 0 {
            break;
        }
    }
    outcome
}
