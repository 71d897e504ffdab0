pub mod dataset;
pub mod sample_store;
pub mod text_format;

pub use dataset::{Dataset, Sample};
pub use sample_store::{SampleStore, StorePaths};
