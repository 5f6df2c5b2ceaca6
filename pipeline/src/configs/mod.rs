mod adapter;
mod algorithm;
mod pipeline;

pub use adapter::{Adapter, Plan};
pub use algorithm::{AlgorithmConfig, PredictorType};
pub use pipeline::{DatasetConfig, InferenceConfig, InstanceSpec, PipelineConfig};
