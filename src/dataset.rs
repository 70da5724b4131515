//! Per-slot runtime statistics.
//!
//! A [`RuntimeDataset`] holds one [`RuntimeRecord`] per slot:
//!
//! ```text
//! slot 0        baseline mean over all baseline repetitions
//! slot 1..=r    one instrumented repetition each
//! ```
//!
//! Three accumulation rules apply, and all arithmetic on slots goes through them:
//!
//! - [`accumulate`](RuntimeRecord::accumulate) adds into a running sum (baseline passes),
//! - [`average`](RuntimeRecord::average) divides every field once the sum is complete,
//! - [`set_exact`](RuntimeRecord::set_exact) overwrites a slot owned by a single repetition.
//!
//! The driver divides the baseline slot exactly once, after its last pass. Dividing
//! again would silently corrupt the mean, so dataset mutation is crate-private and
//! callers receive a finished, read-only dataset.

use serde::{Deserialize, Serialize};

/// Index of the baseline slot.
pub const BASELINE_SLOT: usize = 0;

/// `count / time`, or zero when no time elapsed.
pub fn throughput(count: u64, time: f64) -> f64 {
    if time > 0.0 {
        count as f64 / time
    } else {
        0.0
    }
}

/// `(time - baseline_time) / count`, or zero when there were no events.
pub fn overhead_per_call(count: u64, time: f64, baseline_time: f64) -> f64 {
    if count == 0 {
        0.0
    } else {
        (time - baseline_time) / count as f64
    }
}

/// One measurement slot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeRecord {
    instrumentation_count: u64,
    elapsed_time: f64,
    throughput: f64,
    overhead_per_call: f64,
}

impl RuntimeRecord {
    /// Number of instrumentation events observed in this slot.
    pub fn instrumentation_count(&self) -> u64 {
        self.instrumentation_count
    }

    /// Wall-clock seconds of the measured region.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// Events per second.
    pub fn throughput(&self) -> f64 {
        self.throughput
    }

    /// Seconds of overhead per event relative to the baseline slot. Zero for the baseline itself.
    pub fn overhead_per_call(&self) -> f64 {
        self.overhead_per_call
    }

    /// Adds one pass into a running sum. A pass with zero elapsed time contributes no throughput.
    pub fn accumulate(&mut self, count: u64, time: f64) {
        self.instrumentation_count += count;
        self.elapsed_time += time;
        self.throughput += throughput(count, time);
    }

    /// Divides every field by `divisor`. A zero divisor leaves the record untouched.
    pub fn average(&mut self, divisor: u64) {
        if divisor == 0 {
            return;
        }
        let d = divisor as f64;
        self.instrumentation_count /= divisor;
        self.elapsed_time /= d;
        self.throughput /= d;
        self.overhead_per_call /= d;
    }

    /// Overwrites the slot with the results of a single pass.
    pub fn set_exact(&mut self, count: u64, time: f64, throughput: f64) {
        self.instrumentation_count = count;
        self.elapsed_time = time;
        self.throughput = throughput;
    }

    pub fn set_overhead(&mut self, baseline_time: f64) {
        self.overhead_per_call =
            overhead_per_call(self.instrumentation_count, self.elapsed_time, baseline_time);
    }
}

/// Ordered collection of measurement slots produced by one driver invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuntimeDataset {
    records: Vec<RuntimeRecord>,
}

impl RuntimeDataset {
    /// One baseline slot followed by one slot per instrumented repetition.
    pub(crate) fn for_repetitions(repetitions: u64) -> Self {
        Self::with_entries(repetitions as usize + 1)
    }

    pub(crate) fn with_entries(entries: usize) -> Self {
        Self {
            records: vec![RuntimeRecord::default(); entries],
        }
    }

    // Slot mutators. Each panics if `index` is out of range.

    pub(crate) fn accumulate(&mut self, index: usize, count: u64, time: f64) {
        self.records[index].accumulate(count, time);
    }

    pub(crate) fn average(&mut self, index: usize, divisor: u64) {
        self.records[index].average(divisor);
    }

    pub(crate) fn set_exact(&mut self, index: usize, count: u64, time: f64, throughput: f64) {
        self.records[index].set_exact(count, time, throughput);
    }

    /// Fills `overhead_per_call` of every instrumented slot from the baseline mean.
    pub(crate) fn compute_overheads(&mut self) {
        let Some((baseline, rest)) = self.records.split_first_mut() else {
            return;
        };
        let baseline_time = baseline.elapsed_time;
        for record in rest {
            record.set_overhead(baseline_time);
        }
    }

    pub fn entries(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[RuntimeRecord] {
        &self.records
    }

    pub fn baseline(&self) -> Option<&RuntimeRecord> {
        self.records.get(BASELINE_SLOT)
    }

    /// Instrumented slots, in repetition order.
    pub fn instrumented(&self) -> &[RuntimeRecord] {
        self.records.get(1..).unwrap_or(&[])
    }

    pub fn instrumentation_counts(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.instrumentation_count).collect()
    }

    pub fn elapsed_times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.elapsed_time).collect()
    }

    pub fn throughputs(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.throughput).collect()
    }

    pub fn overheads(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.overhead_per_call).collect()
    }

    /// Per-slot overhead against the mean elapsed time of another dataset.
    ///
    /// This compares two separate runs, e.g. a no-op backend against a real one.
    /// With `None` the mean of this dataset's own timings is used. Slots without
    /// events report zero.
    pub fn overhead_against(&self, baseline: Option<&RuntimeDataset>) -> Vec<f64> {
        let baseline = baseline.unwrap_or(self);
        let mean = if baseline.records.is_empty() {
            0.0
        } else {
            baseline.records.iter().map(|r| r.elapsed_time).sum::<f64>()
                / baseline.records.len() as f64
        };
        self.records
            .iter()
            .map(|r| overhead_per_call(r.instrumentation_count, r.elapsed_time, mean))
            .collect()
    }
}
