//! Dense square matrix multiply, `a += b * c`, on row-major buffers.
//!
//! The instrumented variant wraps the `k`-loop of every `(i, j)` pair with
//! `create`/`start` before and `stop` after, so one call issues `size * size` events.

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::adapter::Instrument;
#[cfg(any(feature = "c-kernel", feature = "native-kernel"))]
use crate::adapter::Label;
use crate::KernelFlavor;

/// Label site used for every matmul region.
pub const SITE: &str = "matmul";

/// Initial buffer contents applied by [`Matrices::reset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Fill {
    /// `a = 0`, `b = 1`, `c = 2`.
    #[default]
    Standard,
    /// `a = b = c = 1`; the accumulator starts pre-seeded.
    Ones,
    /// `a = 0`, `b` and `c` uniform in `[0, 1)` from a seeded generator.
    Seeded(u64),
}

impl Fill {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fill::Standard => "standard",
            Fill::Ones => "ones",
            Fill::Seeded(_) => "seeded",
        }
    }
}

/// The accumulator `a` and the two inputs `b`, `c`, each `size x size`.
#[derive(Clone, Debug)]
pub struct Matrices {
    size: usize,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
}

impl Matrices {
    /// Allocates zeroed buffers. Call [`reset`](Self::reset) before multiplying.
    pub fn new(size: usize) -> Self {
        let len = size * size;
        Self {
            size,
            a: vec![0.0; len],
            b: vec![0.0; len],
            c: vec![0.0; len],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn accumulator(&self) -> &[f64] {
        &self.a
    }

    /// Reinitializes all three buffers so repeated runs start from identical state.
    pub fn reset(&mut self, fill: Fill) {
        match fill {
            Fill::Standard => {
                self.a.fill(0.0);
                self.b.fill(1.0);
                self.c.fill(2.0);
            }
            Fill::Ones => {
                self.a.fill(1.0);
                self.b.fill(1.0);
                self.c.fill(1.0);
            }
            Fill::Seeded(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                self.a.fill(0.0);
                for x in self.b.iter_mut().chain(self.c.iter_mut()) {
                    *x = rng.gen::<f64>();
                }
            }
        }
    }

    /// Sum of every element of the accumulator.
    pub fn checksum(&self) -> f64 {
        self.a.iter().sum()
    }

    /// One uninstrumented multiply. Returns the number of events issued, always 0,
    /// or `None` when `flavor` was not compiled in.
    pub fn mm(&mut self, flavor: KernelFlavor) -> Option<u64> {
        match flavor {
            #[cfg(feature = "c-kernel")]
            KernelFlavor::C => mm_indexed(self.size, &mut self.a, &self.b, &self.c),
            #[cfg(feature = "native-kernel")]
            KernelFlavor::Native => mm_rows(self.size, &mut self.a, &self.b, &self.c),
            #[allow(unreachable_patterns)]
            _ => return None,
        }
        Some(0)
    }

    /// One instrumented multiply. Returns the number of events issued, or `None`
    /// when `flavor` was not compiled in.
    pub fn mm_inst<I: Instrument>(&mut self, flavor: KernelFlavor, inst: &mut I) -> Option<u64> {
        match flavor {
            #[cfg(feature = "c-kernel")]
            KernelFlavor::C => mm_indexed_inst(self.size, &mut self.a, &self.b, &self.c, inst),
            #[cfg(feature = "native-kernel")]
            KernelFlavor::Native => mm_rows_inst(self.size, &mut self.a, &self.b, &self.c, inst),
            #[allow(unreachable_patterns)]
            _ => {
                let _ = inst;
                return None;
            }
        }
        Some((self.size * self.size) as u64)
    }
}

#[cfg(feature = "c-kernel")]
fn mm_indexed(s: usize, a: &mut [f64], b: &[f64], c: &[f64]) {
    for i in 0..s {
        for j in 0..s {
            for k in 0..s {
                a[i * s + j] += b[i * s + k] * c[k * s + j];
            }
        }
    }
}

#[cfg(feature = "c-kernel")]
fn mm_indexed_inst<I: Instrument>(s: usize, a: &mut [f64], b: &[f64], c: &[f64], inst: &mut I) {
    for i in 0..s {
        for j in 0..s {
            let label = Label::new(SITE, j as u64);
            inst.create(label);
            inst.start(label);
            for k in 0..s {
                a[i * s + j] += b[i * s + k] * c[k * s + j];
            }
            inst.stop(label);
        }
    }
}

// chunks_exact and step_by both reject zero, so an empty matrix returns early.

#[cfg(feature = "native-kernel")]
fn mm_rows(s: usize, a: &mut [f64], b: &[f64], c: &[f64]) {
    if s == 0 {
        return;
    }
    for (a_row, b_row) in a.chunks_exact_mut(s).zip(b.chunks_exact(s)) {
        for (j, a_ij) in a_row.iter_mut().enumerate() {
            for (b_ik, c_kj) in b_row.iter().zip(c[j..].iter().step_by(s)) {
                *a_ij += b_ik * c_kj;
            }
        }
    }
}

#[cfg(feature = "native-kernel")]
fn mm_rows_inst<I: Instrument>(s: usize, a: &mut [f64], b: &[f64], c: &[f64], inst: &mut I) {
    if s == 0 {
        return;
    }
    for (a_row, b_row) in a.chunks_exact_mut(s).zip(b.chunks_exact(s)) {
        for (j, a_ij) in a_row.iter_mut().enumerate() {
            let label = Label::new(SITE, j as u64);
            inst.create(label);
            inst.start(label);
            for (b_ik, c_kj) in b_row.iter().zip(c[j..].iter().step_by(s)) {
                *a_ij += b_ik * c_kj;
            }
            inst.stop(label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{CountingInstrument, NoopInstrument};

    fn flavors() -> Vec<KernelFlavor> {
        [KernelFlavor::C, KernelFlavor::Native]
            .into_iter()
            .filter(KernelFlavor::is_available)
            .collect()
    }

    #[test]
    fn test_standard_fill_product() {
        for flavor in flavors() {
            let mut m = Matrices::new(4);
            m.reset(Fill::Standard);
            assert_eq!(m.mm(flavor), Some(0));
            // every element is sum_k 1 * 2 over 4 terms
            assert!(m.accumulator().iter().all(|&x| x == 8.0));
            assert_eq!(m.checksum(), 16.0 * 8.0);
        }
    }

    #[cfg(all(feature = "c-kernel", feature = "native-kernel"))]
    #[test]
    fn test_flavors_agree_on_non_uniform_input() {
        let mut x = Matrices::new(3);
        let mut y = Matrices::new(3);
        for m in [&mut x, &mut y] {
            m.reset(Fill::Standard);
            m.b = (1..=9).map(f64::from).collect();
            m.c = (10..=18).map(f64::from).collect();
        }
        x.mm(KernelFlavor::C);
        y.mm(KernelFlavor::Native);
        assert_eq!(x.accumulator(), y.accumulator());
        // row 0 of b = [1,2,3], column 0 of c = [10,13,16]
        assert_eq!(x.accumulator()[0], 10.0 + 26.0 + 48.0);
    }

    #[test]
    fn test_instrumented_matches_plain() {
        for flavor in flavors() {
            for size in [1, 8, 64] {
                let mut plain = Matrices::new(size);
                let mut inst = Matrices::new(size);
                plain.reset(Fill::Seeded(7));
                inst.reset(Fill::Seeded(7));
                for _ in 0..3 {
                    plain.mm(flavor);
                    inst.mm_inst(flavor, &mut NoopInstrument);
                }
                assert!((plain.checksum() - inst.checksum()).abs() <= 1e-9);
            }
        }
    }

    #[test]
    fn test_instrumented_issues_one_event_per_cell() {
        for flavor in flavors() {
            let mut m = Matrices::new(8);
            m.reset(Fill::Standard);
            let mut counter = CountingInstrument::new();
            let events = m.mm_inst(flavor, &mut counter);
            assert_eq!(events, Some(64));
            assert_eq!(counter.starts(), 64);
            assert_eq!(counter.stops(), 64);
            assert_eq!(counter.create_calls(), 64);
            assert_eq!(counter.callsites(), 8);
            assert_eq!(counter.open_regions(), 0);
            assert_eq!(m.mm(flavor), Some(0));
        }
    }

    #[test]
    fn test_reset_restores_state() {
        for flavor in flavors() {
            let mut m = Matrices::new(5);
            m.reset(Fill::Ones);
            m.mm(flavor);
            let first = m.checksum();
            m.reset(Fill::Ones);
            m.mm(flavor);
            assert_eq!(m.checksum(), first);
            // a starts at 1, plus 5 products of 1 * 1
            assert_eq!(first, 25.0 * 6.0);
        }
    }

    #[test]
    fn test_empty_matrix() {
        for flavor in flavors() {
            let mut m = Matrices::new(0);
            m.reset(Fill::Standard);
            assert_eq!(m.mm(flavor), Some(0));
            assert_eq!(m.mm_inst(flavor, &mut NoopInstrument), Some(0));
            assert_eq!(m.checksum(), 0.0);
        }
    }

    #[cfg(not(feature = "c-kernel"))]
    #[test]
    fn test_indexed_flavor_compiled_out() {
        let mut m = Matrices::new(4);
        m.reset(Fill::Standard);
        let mut counter = CountingInstrument::new();
        assert_eq!(m.mm(KernelFlavor::C), None);
        assert_eq!(m.mm_inst(KernelFlavor::C, &mut counter), None);
        assert_eq!(counter.starts(), 0);
        assert_eq!(m.checksum(), 0.0);
    }

    #[cfg(not(feature = "native-kernel"))]
    #[test]
    fn test_row_flavor_compiled_out() {
        let mut m = Matrices::new(4);
        m.reset(Fill::Standard);
        let mut counter = CountingInstrument::new();
        assert_eq!(m.mm(KernelFlavor::Native), None);
        assert_eq!(m.mm_inst(KernelFlavor::Native, &mut counter), None);
        assert_eq!(counter.starts(), 0);
        assert_eq!(m.checksum(), 0.0);
    }
}
