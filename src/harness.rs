use std::cell::Cell;
use std::hint::black_box;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }
}

/// Default workload sizes for a profile. Explicit CLI flags override these.
#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub profile: Profile,
    pub seed: u64,
}

impl BenchConfig {
    pub fn matmul_size(&self) -> usize {
        match self.profile {
            Profile::Quick => 50,
            Profile::Full => 100,
        }
    }

    pub fn matmul_inner_iters(&self) -> u64 {
        match self.profile {
            Profile::Quick => 100,
            Profile::Full => 10_000,
        }
    }

    pub fn fibonacci_n(&self) -> u64 {
        match self.profile {
            Profile::Quick => 30,
            Profile::Full => 43,
        }
    }

    pub fn fibonacci_cutoff(&self) -> u64 {
        match self.profile {
            Profile::Quick => 15,
            Profile::Full => 23,
        }
    }

    pub fn repetitions(&self) -> u64 {
        match self.profile {
            Profile::Quick => 3,
            Profile::Full => 5,
        }
    }
}

/// Monotonic time source sampled around each measured region.
pub trait Clock {
    /// Time since an arbitrary fixed origin. Never decreases.
    fn now(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock that advances by a fixed tick on every sample.
///
/// Inject it with [`Runner::with_clock`](crate::driver::Runner::with_clock) to get
/// reproducible timings, e.g. when checking a report pipeline or the averaging
/// arithmetic. A region timed with [`timed`] samples twice, so it always measures
/// exactly one tick.
#[derive(Debug)]
pub struct SteppingClock {
    tick: Duration,
    now: Cell<Duration>,
    samples: Cell<u64>,
}

impl SteppingClock {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            now: Cell::new(Duration::ZERO),
            samples: Cell::new(0),
        }
    }

    /// Number of times [`Clock::now`] has been called.
    pub fn samples(&self) -> u64 {
        self.samples.get()
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Duration {
        let t = self.now.get() + self.tick;
        self.now.set(t);
        self.samples.set(self.samples.get() + 1);
        t
    }
}

/// Runs `f` once between two clock samples and returns its output with the elapsed seconds.
pub fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, f64) {
    let start = clock.now();
    let out = black_box(f());
    let elapsed = clock.now().saturating_sub(start);
    (out, elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepping_clock_measures_one_tick() {
        let clock = SteppingClock::new(Duration::from_millis(250));
        let (out, secs) = timed(&clock, || 7);
        assert_eq!(out, 7);
        assert_eq!(secs, 0.25);
        let (_, secs) = timed(&clock, || ());
        assert_eq!(secs, 0.25);
        assert_eq!(clock.samples(), 4);
    }

    #[test]
    fn test_monotonic_clock_is_non_negative() {
        let clock = MonotonicClock::default();
        let (_, secs) = timed(&clock, || (0..1000u64).sum::<u64>());
        assert!(secs >= 0.0);
    }

    #[test]
    fn test_profile_defaults() {
        let quick = BenchConfig {
            profile: Profile::Quick,
            seed: 0,
        };
        let full = BenchConfig {
            profile: Profile::Full,
            seed: 0,
        };
        assert!(quick.matmul_size() < full.matmul_size());
        assert!(quick.fibonacci_cutoff() < quick.fibonacci_n());
        assert_eq!(full.fibonacci_n(), 43);
        assert_eq!(full.fibonacci_cutoff(), 23);
    }
}
