// The binary in main.rs is a thin prompt-and-print layer over these modules;
// integration tests and benchmarks import them directly.

pub mod config;
pub mod error;
pub mod estimate;
pub mod plot;
pub mod store;

pub use error::{EtaError, Result};
pub use estimate::{Estimate, RootPolicy, fit_and_extrapolate};
pub use store::{Dataset, Sample, SampleStore, StorePaths};
