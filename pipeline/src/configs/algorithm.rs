use std::{collections::BTreeMap, fmt, str::FromStr};

use dataset::WireFormat;
use serde::{Deserialize, Serialize};

/// What a linear learner is trained to predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorType {
    BinaryClassifier,
    MulticlassClassifier,
    Regressor,
}

impl PredictorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BinaryClassifier => "binary_classifier",
            Self::MulticlassClassifier => "multiclass_classifier",
            Self::Regressor => "regressor",
        }
    }
}

impl fmt::Display for PredictorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary_classifier" => Ok(Self::BinaryClassifier),
            "multiclass_classifier" => Ok(Self::MulticlassClassifier),
            "regressor" => Ok(Self::Regressor),
            other => Err(format!("unknown predictor_type {other:?}")),
        }
    }
}

/// The managed training algorithm and its named hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum AlgorithmConfig {
    LinearLearner {
        feature_dim: usize,
        predictor_type: String,
        mini_batch_size: usize,
        #[serde(default)]
        num_classes: Option<usize>,
    },
    Pca {
        feature_dim: usize,
        num_components: usize,
        mini_batch_size: usize,
        #[serde(default)]
        subtract_mean: bool,
        #[serde(default = "default_algorithm_mode")]
        algorithm_mode: String,
    },
    /// A user supplied training image, fed CSV with the label first.
    CustomContainer {
        image: String,
        #[serde(default)]
        hyperparameters: BTreeMap<String, String>,
    },
    Mxnet {
        entry_point: String,
        framework_version: String,
        #[serde(default)]
        hyperparameters: BTreeMap<String, String>,
    },
    Tensorflow {
        entry_point: String,
        framework_version: String,
        training_steps: u64,
        evaluation_steps: u64,
        #[serde(default)]
        hyperparameters: BTreeMap<String, String>,
    },
}

fn default_algorithm_mode() -> String {
    "regular".into()
}

impl AlgorithmConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LinearLearner { .. } => "linear-learner",
            Self::Pca { .. } => "pca",
            Self::CustomContainer { .. } => "custom-container",
            Self::Mxnet { .. } => "mxnet",
            Self::Tensorflow { .. } => "tensorflow",
        }
    }

    /// The width of the rows the algorithm is configured for, if it declares one.
    pub fn feature_dim(&self) -> Option<usize> {
        match self {
            Self::LinearLearner { feature_dim, .. } | Self::Pca { feature_dim, .. } => {
                Some(*feature_dim)
            }
            _ => None,
        }
    }

    pub fn mini_batch_size(&self) -> Option<usize> {
        match self {
            Self::LinearLearner {
                mini_batch_size, ..
            }
            | Self::Pca {
                mini_batch_size, ..
            } => Some(*mini_batch_size),
            _ => None,
        }
    }

    /// Unsupervised algorithms are uploaded without labels.
    pub fn uses_labels(&self) -> bool {
        !matches!(self, Self::Pca { .. })
    }

    pub fn wire_format(&self) -> WireFormat {
        match self {
            Self::CustomContainer { .. } => WireFormat::Csv,
            _ => WireFormat::RecordIo,
        }
    }

    /// Renders the hyperparameters as the string map the service expects.
    pub fn hyperparameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        let mut set = |key: &str, value: String| {
            params.insert(key.to_string(), value);
        };

        match self {
            Self::LinearLearner {
                feature_dim,
                predictor_type,
                mini_batch_size,
                num_classes,
            } => {
                set("feature_dim", feature_dim.to_string());
                set("predictor_type", predictor_type.clone());
                set("mini_batch_size", mini_batch_size.to_string());
                if let Some(n) = num_classes {
                    set("num_classes", n.to_string());
                }
            }
            Self::Pca {
                feature_dim,
                num_components,
                mini_batch_size,
                subtract_mean,
                algorithm_mode,
            } => {
                set("feature_dim", feature_dim.to_string());
                set("num_components", num_components.to_string());
                set("mini_batch_size", mini_batch_size.to_string());
                set("subtract_mean", subtract_mean.to_string());
                set("algorithm_mode", algorithm_mode.clone());
            }
            Self::CustomContainer { hyperparameters, .. } | Self::Mxnet { hyperparameters, .. } => {
                return hyperparameters.clone();
            }
            Self::Tensorflow {
                training_steps,
                evaluation_steps,
                hyperparameters,
                ..
            } => {
                for (key, value) in hyperparameters {
                    set(key, value.clone());
                }
                set("training_steps", training_steps.to_string());
                set("evaluation_steps", evaluation_steps.to_string());
            }
        }

        params
    }
}
