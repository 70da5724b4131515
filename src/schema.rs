use serde::{Deserialize, Serialize};

use crate::dataset::RuntimeDataset;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub backend: String,
    pub seed: u64,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelRun {
    /// e.g. `matmul.c` or `fibonacci`.
    pub name: String,
    pub params: serde_json::Value,

    /// Mean of `overhead_per_call` over the instrumented slots.
    pub mean_overhead_per_call: f64,

    /// Per-slot overhead against a separate no-op run, when one was made.
    pub overhead_vs_noop: Option<Vec<f64>>,

    pub dataset: RuntimeDataset,
}

impl KernelRun {
    pub fn new(
        name: impl Into<String>,
        params: serde_json::Value,
        dataset: RuntimeDataset,
    ) -> Self {
        let instrumented = dataset.instrumented();
        let mean_overhead_per_call = if instrumented.is_empty() {
            0.0
        } else {
            let total: f64 = instrumented.iter().map(|r| r.overhead_per_call()).sum();
            total / instrumented.len() as f64
        };
        Self {
            name: name.into(),
            params,
            mean_overhead_per_call,
            overhead_vs_noop: None,
            dataset,
        }
    }

    pub fn with_noop_reference(mut self, noop: &RuntimeDataset) -> Self {
        self.overhead_vs_noop = Some(self.dataset.overhead_against(Some(noop)));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverheadReport {
    pub run: RunMeta,
    pub runs: Vec<KernelRun>,
}
