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

//! Errors-and-erasures decoding for the shortened Reed-Solomon codes used by CIRC.
//!
//! Both codes carry four parity symbols with generator roots α^0..α^3. A codeword is laid out
//! data-first with the parity symbols last, and the first symbol is the coefficient of the
//! highest power, so position `k` of an `N` symbol codeword has locator α^(N-1-k).
//!
//! Decoding follows the classic pipeline: syndromes, Berlekamp-Massey seeded with the erasure
//! locator, a Chien search over the `N` valid positions only, Forney magnitudes and a final
//! syndrome check. A codeword is only ever modified when the final check passes.

use crate::{
    circ::gf::{GaloisField, GF256},
    types::enums::CodewordStatus,
};

/// The number of parity symbols in each CIRC code.
pub const RS_PARITY: usize = 4;

// Working length of locator polynomials. One spare term absorbs the x*B shift.
const POLY_LEN: usize = RS_PARITY + 2;

/// The C1 code: 28 data symbols protected by 4 parity symbols.
pub type C1Code = ReedSolomon<32, 28>;
/// The C2 code: 24 data symbols protected by 4 parity symbols.
pub type C2Code = ReedSolomon<28, 24>;

#[derive(Copy, Clone, Debug, Default)]
pub struct ReedSolomon<const N: usize, const K: usize>;

/// Generator polynomial (x - α^0)(x - α^1)(x - α^2)(x - α^3), highest power first.
const GENERATOR: [u8; RS_PARITY + 1] = generator_poly();

const fn generator_poly() -> [u8; RS_PARITY + 1] {
    let gf = GaloisField::new();
    // Built lowest power first, then reversed.
    let mut g = [0u8; RS_PARITY + 1];
    g[0] = 1;
    let mut j = 0;
    while j < RS_PARITY {
        let root = gf.alpha_pow(j);
        let mut i = j + 1;
        while i > 0 {
            g[i] = g[i - 1] ^ gf.mul(g[i], root);
            i -= 1;
        }
        g[0] = gf.mul(g[0], root);
        j += 1;
    }
    let mut out = [0u8; RS_PARITY + 1];
    let mut k = 0;
    while k <= RS_PARITY {
        out[k] = g[RS_PARITY - k];
        k += 1;
    }
    out
}

impl<const N: usize, const K: usize> ReedSolomon<N, K> {
    pub const fn new() -> Self {
        assert!(N == K + RS_PARITY && N <= 255);
        Self
    }

    /// Locator of codeword position `pos`.
    #[inline]
    fn locator(pos: usize) -> u8 {
        GF256.alpha_pow(N - 1 - pos)
    }

    /// Fill the parity symbols of `codeword` (positions K..N) from its data symbols (0..K).
    pub fn encode(&self, codeword: &mut [u8; N]) {
        let mut rem = [0u8; RS_PARITY];
        for &d in codeword[..K].iter() {
            let feedback = d ^ rem[0];
            for i in 0..RS_PARITY - 1 {
                rem[i] = rem[i + 1] ^ GF256.mul(feedback, GENERATOR[i + 1]);
            }
            rem[RS_PARITY - 1] = GF256.mul(feedback, GENERATOR[RS_PARITY]);
        }
        codeword[K..].copy_from_slice(&rem);
    }

    /// Compute the four syndromes S_j = c(α^j).
    pub fn syndromes(&self, codeword: &[u8; N]) -> [u8; RS_PARITY] {
        let mut syndromes = [0u8; RS_PARITY];
        for (j, s) in syndromes.iter_mut().enumerate() {
            let root = GF256.alpha_pow(j);
            *s = codeword.iter().fold(0, |acc, &c| GF256.mul(acc, root) ^ c);
        }
        syndromes
    }

    /// Return true if `codeword` has all-zero syndromes.
    pub fn is_valid(&self, codeword: &[u8; N]) -> bool {
        self.syndromes(codeword).iter().all(|&s| s == 0)
    }

    /// Decode `codeword` in place, treating positions flagged in `erasures` as erased.
    ///
    /// Returns [CodewordStatus::Passed] if there was nothing to correct,
    /// [CodewordStatus::Corrected] with the number of symbols changed, or
    /// [CodewordStatus::Failed], in which case `codeword` is left untouched.
    pub fn decode(&self, codeword: &mut [u8; N], erasures: &[bool; N]) -> CodewordStatus {
        let syndromes = self.syndromes(codeword);
        if syndromes.iter().all(|&s| s == 0) {
            return CodewordStatus::Passed;
        }

        let erasure_ct = erasures.iter().filter(|&&e| e).count();
        if erasure_ct > RS_PARITY {
            log::trace!("decode(): {} erasures exceed capacity", erasure_ct);
            return CodewordStatus::Failed;
        }

        // Seed the error locator with the erasure locator Γ(x) = Π(1 + X_i x).
        let mut lambda = [0u8; POLY_LEN];
        lambda[0] = 1;
        for pos in (0..N).filter(|&pos| erasures[pos]) {
            let x = Self::locator(pos);
            for i in (1..POLY_LEN).rev() {
                lambda[i] ^= GF256.mul(lambda[i - 1], x);
            }
        }

        let mut prev = lambda;
        let mut len = erasure_ct;
        for r in erasure_ct..RS_PARITY {
            let mut delta = 0u8;
            for i in 0..=r {
                delta ^= GF256.mul(lambda[i], syndromes[r - i]);
            }

            let mut shifted = [0u8; POLY_LEN];
            shifted[1..].copy_from_slice(&prev[..POLY_LEN - 1]);

            if delta == 0 {
                prev = shifted;
                continue;
            }

            let mut next = lambda;
            for (n, &s) in next.iter_mut().zip(shifted.iter()) {
                *n ^= GF256.mul(delta, s);
            }

            if 2 * len <= r + erasure_ct {
                let inv = GF256.inv(delta);
                for (p, &l) in prev.iter_mut().zip(lambda.iter()) {
                    *p = GF256.mul(l, inv);
                }
                len = r + 1 + erasure_ct - len;
            }
            else {
                prev = shifted;
            }
            lambda = next;
        }

        let degree = lambda.iter().rposition(|&c| c != 0).unwrap_or(0);
        if degree != len || 2 * (len - erasure_ct) + erasure_ct > RS_PARITY {
            log::trace!("decode(): locator degree {} exceeds capacity", degree);
            return CodewordStatus::Failed;
        }

        // Chien search, restricted to the positions that exist in the shortened code.
        let mut positions = [0usize; RS_PARITY];
        let mut found = 0;
        for pos in 0..N {
            let x_inv = GF256.inv(Self::locator(pos));
            if GF256.eval(&lambda, x_inv) == 0 {
                if found == RS_PARITY {
                    return CodewordStatus::Failed;
                }
                positions[found] = pos;
                found += 1;
            }
        }
        if found != degree {
            log::trace!("decode(): found {} roots for a degree {} locator", found, degree);
            return CodewordStatus::Failed;
        }

        // Error evaluator Ω(x) = S(x)Λ(x) mod x^4.
        let mut omega = [0u8; RS_PARITY];
        for (i, o) in omega.iter_mut().enumerate() {
            for j in 0..=i {
                *o ^= GF256.mul(syndromes[i - j], lambda[j]);
            }
        }

        let mut corrected = *codeword;
        let mut changed = 0u8;
        for &pos in positions[..found].iter() {
            let x = Self::locator(pos);
            let x_inv = GF256.inv(x);

            // Formal derivative: only odd terms survive in characteristic 2.
            let mut denom = 0u8;
            let mut i = 1;
            while i < POLY_LEN {
                denom ^= GF256.mul(lambda[i], GF256.alpha_pow(GF256.log(x_inv) * (i - 1)));
                i += 2;
            }
            if denom == 0 {
                return CodewordStatus::Failed;
            }

            let magnitude = GF256.mul(x, GF256.div(GF256.eval(&omega, x_inv), denom));
            if magnitude != 0 {
                corrected[pos] ^= magnitude;
                changed += 1;
            }
        }

        if !self.is_valid(&corrected) {
            log::trace!("decode(): correction failed final syndrome check");
            return CodewordStatus::Failed;
        }

        *codeword = corrected;
        CodewordStatus::Corrected(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

    fn random_codeword<const N: usize, const K: usize>(rng: &mut StdRng) -> [u8; N] {
        let mut cw = [0u8; N];
        for b in cw[..K].iter_mut() {
            *b = rng.gen();
        }
        ReedSolomon::<N, K>::new().encode(&mut cw);
        cw
    }

    #[test]
    fn test_generator() {
        // g(α^j) = 0 for each root
        let mut low_first = GENERATOR;
        low_first.reverse();
        for j in 0..RS_PARITY {
            assert_eq!(GF256.eval(&low_first, GF256.alpha_pow(j)), 0);
        }
        assert_eq!(GENERATOR[0], 1);
    }

    #[test]
    fn test_encode_valid() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let cw = random_codeword::<32, 28>(&mut rng);
            assert!(C1Code::new().is_valid(&cw));
        }
    }

    #[test]
    fn test_clean_codeword_passes() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut cw = random_codeword::<28, 24>(&mut rng);
        let original = cw;
        let status = C2Code::new().decode(&mut cw, &[false; 28]);
        assert_eq!(status, CodewordStatus::Passed);
        assert_eq!(cw, original);
    }

    #[test]
    fn test_capacity() {
        // Every combination of 2*errors + erasures <= 4 must be corrected.
        let mut rng = StdRng::seed_from_u64(3);
        let code = C1Code::new();
        for (errors, erasures) in [(1, 0), (2, 0), (0, 1), (0, 4), (1, 1), (1, 2), (0, 3)] {
            for _ in 0..200 {
                let original = random_codeword::<32, 28>(&mut rng);
                let mut cw = original;
                let mut flags = [false; 32];
                let picks = sample(&mut rng, 32, errors + erasures);
                for (n, pos) in picks.iter().enumerate() {
                    cw[pos] ^= rng.gen_range(1..=255u8);
                    if n >= errors {
                        flags[pos] = true;
                    }
                }
                let status = code.decode(&mut cw, &flags);
                assert!(
                    !status.is_failed(),
                    "failed with {} errors {} erasures",
                    errors,
                    erasures
                );
                assert_eq!(cw, original);
            }
        }
    }

    #[test]
    fn test_erased_but_correct_symbols() {
        // Erasures whose values happen to be correct leave zero syndromes.
        let mut rng = StdRng::seed_from_u64(4);
        let original = random_codeword::<32, 28>(&mut rng);
        let mut cw = original;
        let mut flags = [false; 32];
        flags[3] = true;
        flags[30] = true;
        assert_eq!(C1Code::new().decode(&mut cw, &flags), CodewordStatus::Passed);

        // One genuine error among erased positions reports a single correction.
        cw[3] ^= 0x40;
        assert_eq!(C1Code::new().decode(&mut cw, &flags), CodewordStatus::Corrected(1));
        assert_eq!(cw, original);
    }

    #[test]
    fn test_weight_five() {
        // Five symbol errors exceed capacity. The decoder either fails and leaves the
        // codeword untouched, or lands on another valid codeword; it never emits a partial
        // correction.
        let mut rng = StdRng::seed_from_u64(5);
        let code = C2Code::new();
        let mut failures = 0;
        for _ in 0..500 {
            let original = random_codeword::<28, 24>(&mut rng);
            let mut cw = original;
            for pos in sample(&mut rng, 28, 5).iter() {
                cw[pos] ^= rng.gen_range(1..=255u8);
            }
            let received = cw;
            let status = code.decode(&mut cw, &[false; 28]);
            if status.is_failed() {
                assert_eq!(cw, received);
                failures += 1;
            }
            else {
                assert!(code.is_valid(&cw));
            }
        }
        // Shortened codes reject the vast majority of weight-5 patterns.
        assert!(failures >= 480, "only {} of 500 rejected", failures);
    }

    #[test]
    fn test_too_many_erasures() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut cw = random_codeword::<32, 28>(&mut rng);
        cw[0] ^= 1;
        let mut flags = [false; 32];
        flags[..5].iter_mut().for_each(|f| *f = true);
        let received = cw;
        assert_eq!(C1Code::new().decode(&mut cw, &flags), CodewordStatus::Failed);
        assert_eq!(cw, received);
    }
}
