//! Workload kernels. Each has a plain variant and one instrumented through an
//! [`Instrument`](crate::adapter::Instrument) around its innermost repeated unit of work.

pub mod fibonacci;
pub mod matmul;
