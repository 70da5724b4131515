use clap::ValueEnum;

pub mod adapter;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod harness;
pub mod kernels;
pub mod schema;

pub use dataset::{RuntimeDataset, RuntimeRecord};
pub use driver::{run_fibonacci, run_matrix_multiply, Runner};
pub use error::{BenchError, BenchResult};

/// Matrix-multiply kernel formulation to benchmark.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum KernelFlavor {
    /// Flat row-major buffers walked with explicit index arithmetic.
    #[default]
    C,
    /// Row slices and strided column iterators.
    #[value(alias = "cxx")]
    Native,
}

impl KernelFlavor {
    /// Parses a selector string, case-insensitively. Unknown selectors yield `None`.
    pub fn parse(selector: &str) -> Option<Self> {
        match selector.to_ascii_lowercase().as_str() {
            "c" => Some(KernelFlavor::C),
            "native" | "cxx" => Some(KernelFlavor::Native),
            _ => None,
        }
    }

    /// Whether this flavor was compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            KernelFlavor::C => cfg!(feature = "c-kernel"),
            KernelFlavor::Native => cfg!(feature = "native-kernel"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KernelFlavor::C => "c",
            KernelFlavor::Native => "native",
        }
    }
}
