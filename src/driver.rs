//! Run driver: warm-up, baseline passes, instrumented passes, cross-checks.
//!
//! Buffer resets happen outside the timed regions for both the baseline and the
//! instrumented passes, so both bound the same logical work. The baseline slot is
//! a running sum divided exactly once after its last pass; each instrumented
//! repetition owns its own slot.

use std::hint::black_box;

use tracing::{debug, info};

use crate::adapter::{Instrument, NoopInstrument};
use crate::dataset::{throughput, RuntimeDataset, BASELINE_SLOT};
use crate::error::{BenchError, BenchResult};
use crate::harness::{timed, Clock, MonotonicClock};
use crate::kernels::fibonacci::{self, Policy};
use crate::kernels::matmul::{Fill, Matrices};
use crate::KernelFlavor;

/// Largest absolute difference tolerated between baseline and instrumented checksums.
pub const CHECKSUM_TOLERANCE: f64 = 1.0e-9;

#[derive(Clone, Debug)]
pub struct MatmulParams {
    /// Matrices are `size x size`.
    pub size: usize,
    /// Kernel calls inside one timed pass.
    pub inner_iters: u64,
    /// Baseline passes, and separately instrumented passes.
    pub repetitions: u64,
    pub flavor: KernelFlavor,
    pub fill: Fill,
}

#[derive(Clone, Debug)]
pub struct FibonacciParams {
    pub n: u64,
    pub cutoff: u64,
    pub repetitions: u64,
}

/// Drives overhead runs against one instrumentation backend.
///
/// The backend is configured exactly once, when the runner is built.
#[derive(Debug)]
pub struct Runner<I: Instrument = NoopInstrument, C: Clock = MonotonicClock> {
    instrument: I,
    clock: C,
}

impl<I: Instrument> Runner<I, MonotonicClock> {
    pub fn new(instrument: I) -> Self {
        Self::with_clock(instrument, MonotonicClock::default())
    }
}

impl<I: Instrument, C: Clock> Runner<I, C> {
    pub fn with_clock(mut instrument: I, clock: C) -> Self {
        instrument.configure();
        Self { instrument, clock }
    }

    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    pub fn into_instrument(self) -> I {
        self.instrument
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Matrix-multiply overhead run.
    ///
    /// Slot 0 holds the mean baseline pass, slots `1..=repetitions` one instrumented
    /// pass each with `size * size * inner_iters` events. A flavor that was not
    /// compiled in fails with [`BenchError::KernelUnavailable`] before any pass runs.
    pub fn matmul(&mut self, params: &MatmulParams) -> BenchResult<RuntimeDataset> {
        let Self { instrument, clock } = self;
        let clock = &*clock;
        let MatmulParams {
            size,
            inner_iters,
            repetitions,
            flavor,
            fill,
        } = *params;

        let unavailable = BenchError::KernelUnavailable(flavor.as_str());
        if !flavor.is_available() {
            return Err(unavailable);
        }

        info!(
            size,
            inner_iters,
            repetitions,
            flavor = flavor.as_str(),
            fill = fill.as_str(),
            "running matrix multiply"
        );

        let mut m = Matrices::new(size);

        m.reset(fill);
        for _ in 0..inner_iters {
            m.mm(flavor).ok_or_else(|| unavailable.clone())?;
        }
        info!(checksum = m.checksum(), "[warmup] matmul");

        let mut data = RuntimeDataset::for_repetitions(repetitions);

        let mut base_sum = 0.0;
        for rep in 0..repetitions {
            m.reset(fill);
            let (count, time) = timed(clock, || {
                (0..inner_iters).try_fold(0, |count, _| Some(count + m.mm(flavor)?))
            });
            let count = count.ok_or_else(|| unavailable.clone())?;
            data.accumulate(BASELINE_SLOT, count, time);
            base_sum += m.checksum();
            debug!(rep, time, "baseline pass");
        }
        data.average(BASELINE_SLOT, repetitions);

        let mut inst_sum = 0.0;
        for rep in 0..repetitions {
            m.reset(fill);
            let before = instrument.issued();
            let (count, time) = timed(clock, || {
                (0..inner_iters)
                    .try_fold(0, |count, _| Some(count + m.mm_inst(flavor, instrument)?))
            });
            let count = count.ok_or_else(|| unavailable.clone())?;
            check_issued(before, instrument.issued(), count)?;
            let slot = rep as usize + 1;
            data.set_exact(slot, count, time, throughput(count, time));
            inst_sum += m.checksum();
            debug!(rep, slot, count, time, "instrumented pass");
        }

        check_checksums(base_sum, inst_sum)?;
        data.compute_overheads();
        Ok(data)
    }

    /// Fibonacci overhead run.
    ///
    /// A counting pass first establishes the expected value and the number of
    /// events per instrumented pass.
    pub fn fibonacci(&mut self, params: &FibonacciParams) -> BenchResult<RuntimeDataset> {
        let Self { instrument, clock } = self;
        let clock = &*clock;
        let FibonacciParams {
            n,
            cutoff,
            repetitions,
        } = *params;

        if n > fibonacci::MAX_N {
            return Err(BenchError::InvalidParameter(format!(
                "fibonacci n = {n} exceeds {}",
                fibonacci::MAX_N
            )));
        }

        info!(n, cutoff, repetitions, "running fibonacci");

        let warmup = black_box(fibonacci::fib(n));
        info!(value = warmup, "[warmup] fibonacci");

        let counted = fibonacci::evaluate(Policy::Count, n, cutoff, &mut NoopInstrument);
        let expected = u128::from(counted.value) * u128::from(repetitions);
        debug!(value = counted.value, events = counted.events, "counting pass");

        let mut data = RuntimeDataset::for_repetitions(repetitions);

        let mut ans_none: u128 = 0;
        for rep in 0..repetitions {
            let (value, time) = timed(clock, || fibonacci::fib(n));
            ans_none += u128::from(value);
            data.accumulate(BASELINE_SLOT, 0, time);
            debug!(rep, time, "baseline pass");
        }
        data.average(BASELINE_SLOT, repetitions);
        check_answers("counting vs. baseline", expected, ans_none)?;

        let mut ans_inst: u128 = 0;
        for rep in 0..repetitions {
            let before = instrument.issued();
            let (value, time) = timed(clock, || fibonacci::fib_inst(n, cutoff, instrument));
            check_issued(before, instrument.issued(), counted.events)?;
            ans_inst += u128::from(value);
            let slot = rep as usize + 1;
            data.set_exact(slot, counted.events, time, throughput(counted.events, time));
            debug!(rep, slot, time, "instrumented pass");
        }
        check_answers("baseline vs. instrumented", ans_none, ans_inst)?;

        data.compute_overheads();
        Ok(data)
    }
}

fn check_checksums(baseline: f64, instrumented: f64) -> BenchResult<()> {
    // written so that a NaN on either side fails too
    if (baseline - instrumented).abs() <= CHECKSUM_TOLERANCE {
        Ok(())
    } else {
        Err(BenchError::ChecksumMismatch {
            baseline,
            instrumented,
        })
    }
}

fn check_answers(context: &'static str, expected: u128, actual: u128) -> BenchResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(BenchError::AnswerMismatch {
            context,
            expected,
            actual,
        })
    }
}

fn check_issued(before: Option<u64>, after: Option<u64>, expected: u64) -> BenchResult<()> {
    match (before, after) {
        (Some(before), Some(after)) if after.wrapping_sub(before) != expected => {
            Err(BenchError::EventCountMismatch {
                expected,
                actual: after.wrapping_sub(before),
            })
        }
        _ => Ok(()),
    }
}

/// Matrix-multiply run with the no-op adapter.
///
/// `selector` picks the kernel flavor (`"c"`, `"native"`/`"cxx"`, case-insensitive).
/// An unknown selector, or a flavor not compiled in, yields `Ok(None)`.
pub fn run_matrix_multiply(
    size: usize,
    inner_iters: u64,
    repetitions: u64,
    selector: &str,
) -> BenchResult<Option<RuntimeDataset>> {
    let Some(flavor) = KernelFlavor::parse(selector).filter(KernelFlavor::is_available) else {
        debug!(selector, "no matrix multiply kernel for selector");
        return Ok(None);
    };

    let params = MatmulParams {
        size,
        inner_iters,
        repetitions,
        flavor,
        fill: Fill::Standard,
    };
    Runner::new(NoopInstrument).matmul(&params).map(Some)
}

/// Fibonacci run with the no-op adapter.
pub fn run_fibonacci(n: u64, cutoff: u64, repetitions: u64) -> BenchResult<RuntimeDataset> {
    let params = FibonacciParams {
        n,
        cutoff,
        repetitions,
    };
    Runner::new(NoopInstrument).fibonacci(&params)
}
