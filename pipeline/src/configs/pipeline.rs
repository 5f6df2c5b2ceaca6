use std::{fs, num::NonZeroUsize, path::{Path, PathBuf}};

use dataset::{
    Dataset, SplitSpec,
    loaders::{CsvOptions, load_csv, load_idx_pair},
};
use log::info;
use serde::{Deserialize, Serialize};

use super::AlgorithmConfig;
use crate::error::Result;

/// The machines a training job or an endpoint runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub instance_type: String,
    #[serde(default = "default_instance_count")]
    pub instance_count: usize,
}

fn default_instance_count() -> usize {
    1
}

/// Where the labeled rows come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetConfig {
    /// MNIST style image and label files, optionally gzip compressed.
    Idx {
        train_images: PathBuf,
        train_labels: PathBuf,
        test_images: PathBuf,
        test_labels: PathBuf,
        /// Fraction of the training rows held out for validation.
        #[serde(default)]
        validation: f32,
        #[serde(default)]
        seed: Option<u64>,
    },
    /// A single labeled CSV file, split into partitions.
    Csv {
        path: PathBuf,
        #[serde(default)]
        options: CsvOptions,
        split: SplitSpec,
    },
}

impl DatasetConfig {
    /// Loads and splits the dataset.
    ///
    /// # Returns
    /// The dataset and, for CSV files with named classes, the class names.
    pub fn load(&self) -> Result<(Dataset, Vec<String>)> {
        let loaded = match self {
            Self::Idx {
                train_images,
                train_labels,
                test_images,
                test_labels,
                validation,
                seed,
            } => {
                let train = load_idx_pair(train_images, train_labels)?;
                let test = load_idx_pair(test_images, test_labels)?;
                (Dataset::from_train_test(train, test, *validation, *seed)?, Vec::new())
            }
            Self::Csv {
                path,
                options,
                split,
            } => {
                let csv = load_csv(path, options)?;
                (Dataset::split(csv.partition, *split)?, csv.classes)
            }
        };

        let (dataset, _) = &loaded;
        info!(
            train = dataset.train.len(),
            validation = dataset.validation.len(),
            test = dataset.test.len(),
            dim = dataset.dim();
            "dataset loaded"
        );

        Ok(loaded)
    }
}

/// How the test rows are sent to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub batch_count: Option<usize>,
    #[serde(default)]
    pub max_batch_rows: Option<NonZeroUsize>,
    #[serde(default = "default_concurrency")]
    pub concurrency: NonZeroUsize,
}

fn default_concurrency() -> NonZeroUsize {
    NonZeroUsize::MIN
}

/// A whole notebook run: data, algorithm, machines and inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Names the training job and the objects it produces.
    pub name: String,
    pub dataset: DatasetConfig,
    /// Trains a one vs rest model for this class when set.
    #[serde(default)]
    pub target_class: Option<f32>,
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    pub algorithm: AlgorithmConfig,
    pub training_instance: InstanceSpec,
    pub hosting_instance: InstanceSpec,
    pub inference: InferenceConfig,
    /// The directory backing the local object store.
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,
}

fn default_store_root() -> PathBuf {
    PathBuf::from("store")
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}
