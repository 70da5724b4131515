//! Recursive Fibonacci under three instrumentation policies.
//!
//! Above `cutoff` the `count` policy tallies one event per call and the `inst`
//! policy wraps the two recursive calls in a region. At or below `cutoff` every
//! policy falls back to the plain recursion, which keeps hooks confined to the
//! upper part of the call tree.

use crate::adapter::{Instrument, Label};

/// Label site used for every Fibonacci region.
pub const SITE: &str = "fibonacci";

/// Largest `n` whose result fits in a `u64`.
pub const MAX_N: u64 = 92;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Plain recursion, no counting.
    None,
    /// Plain recursion that tallies the events `Inst` would issue.
    Count,
    /// Recursion wrapped with instrumentation above the cutoff.
    Inst,
}

/// Result of one evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub value: u64,
    /// Events tallied by the `Count` policy; zero otherwise.
    pub events: u64,
}

pub fn fib(n: u64) -> u64 {
    if n < 2 {
        n
    } else {
        fib(n - 1) + fib(n - 2)
    }
}

/// `Count` policy. Adds one to `events` for every call with `n > cutoff`.
pub fn fib_count(n: u64, cutoff: u64, events: &mut u64) -> u64 {
    if n > cutoff {
        *events += 1;
        if n < 2 {
            n
        } else {
            fib_count(n - 1, cutoff, events) + fib_count(n - 2, cutoff, events)
        }
    } else {
        fib(n)
    }
}

/// `Inst` policy. Every call with `n > cutoff` is one instrumented region.
pub fn fib_inst<I: Instrument>(n: u64, cutoff: u64, inst: &mut I) -> u64 {
    if n > cutoff {
        let label = Label::new(SITE, n);
        inst.create(label);
        inst.start(label);
        let ret = if n < 2 {
            n
        } else {
            fib_inst(n - 1, cutoff, inst) + fib_inst(n - 2, cutoff, inst)
        };
        inst.stop(label);
        ret
    } else {
        fib(n)
    }
}

/// Evaluates `fib(n)` under `policy`.
pub fn evaluate<I: Instrument>(policy: Policy, n: u64, cutoff: u64, inst: &mut I) -> Evaluation {
    match policy {
        Policy::None => Evaluation {
            value: fib(n),
            events: 0,
        },
        Policy::Count => {
            let mut events = 0;
            let value = fib_count(n, cutoff, &mut events);
            Evaluation { value, events }
        }
        Policy::Inst => Evaluation {
            value: fib_inst(n, cutoff, inst),
            events: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{CountingInstrument, NoopInstrument};

    #[test]
    fn test_known_values() {
        let expected = [0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(fib(n as u64), *want);
        }
        assert_eq!(fib(20), 6765);
    }

    #[test]
    fn test_policies_agree() {
        for policy in [Policy::None, Policy::Count, Policy::Inst] {
            let eval = evaluate(policy, 20, 10, &mut NoopInstrument);
            assert_eq!(eval.value, 6765);
        }
    }

    #[test]
    fn test_count_matches_issued_events() {
        let counted = evaluate(Policy::Count, 20, 10, &mut NoopInstrument);
        let mut counter = CountingInstrument::new();
        let value = fib_inst(20, 10, &mut counter);

        assert_eq!(value, counted.value);
        assert!(counted.events > 0);
        assert_eq!(counter.starts(), counted.events);
        assert_eq!(counter.stops(), counted.events);
        assert_eq!(counter.create_calls(), counted.events);
        assert_eq!(counter.open_regions(), 0);
        assert_eq!(counter.unmatched_stops(), 0);
        // one callsite per n in (cutoff, n]
        assert_eq!(counter.callsites(), 10);
    }

    #[test]
    fn test_count_one_above_cutoff() {
        // only the root call is above the cutoff
        let eval = evaluate(Policy::Count, 11, 10, &mut NoopInstrument);
        assert_eq!(eval.events, 1);
        assert_eq!(eval.value, 89);
    }

    #[test]
    fn test_cutoff_at_or_above_n_issues_nothing() {
        for cutoff in [20, 21, 100] {
            let counted = evaluate(Policy::Count, 20, cutoff, &mut NoopInstrument);
            assert_eq!(counted.events, 0);

            let mut counter = CountingInstrument::new();
            let eval = evaluate(Policy::Inst, 20, cutoff, &mut counter);
            assert_eq!(counter.starts(), 0);
            assert_eq!(counter.create_calls(), 0);
            assert_eq!(eval.value, fib(20));
            assert_eq!(counted.value, fib(20));
        }
    }

    #[test]
    fn test_zero_cutoff_counts_base_cases() {
        // with cutoff 0 every call with n >= 1 is instrumented, including fib(1)
        let eval = evaluate(Policy::Count, 3, 0, &mut NoopInstrument);
        // calls: 3, 2, 1, 0, 1 -> n > 0 for 3, 2, 1, 1
        assert_eq!(eval.events, 4);
        assert_eq!(eval.value, 2);
    }
}
