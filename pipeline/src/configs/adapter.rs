use dataset::{Dataset, Preparer};
use inference::{BatchPlan, Runner};

use super::{AlgorithmConfig, InstanceSpec, PipelineConfig, PredictorType};
use crate::{error::PipelineErr, location::Location};

const PCA_MODES: [&str; 2] = ["regular", "randomized"];

/// A validated pipeline configuration, resolved against its dataset.
#[derive(Debug, Clone)]
pub struct Plan {
    pub name: String,
    pub algorithm: AlgorithmConfig,
    pub preparer: Preparer,
    /// Labels are remapped to 1 for this class and 0 otherwise.
    pub target_class: Option<f32>,
    pub uses_labels: bool,
    /// The key prefix every object of the run lives under.
    pub root: Location,
    pub training_instance: InstanceSpec,
    pub hosting_instance: InstanceSpec,
    /// How the test partition is split into requests.
    pub batches: BatchPlan,
    pub runner: Runner,
}

impl Plan {
    pub fn output(&self) -> Location {
        self.root.join("output")
    }
}

pub struct Adapter;

impl Default for Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter {
    pub fn new() -> Self {
        Self
    }

    pub fn adapt(&self, config: &PipelineConfig, dataset: &Dataset) -> Result<Plan, PipelineErr> {
        self.validate_instances(config)?;
        self.validate_algorithm(&config.algorithm, dataset)?;

        if config.target_class.is_some() && !config.algorithm.uses_labels() {
            return Err(PipelineErr::InvalidConfig(format!(
                "target_class is set but {} trains without labels",
                config.algorithm.name()
            )));
        }

        if config.bucket.is_empty() {
            return Err(PipelineErr::InvalidConfig("bucket must not be empty".into()));
        }

        let batches = self.adapt_batches(config, dataset)?;
        let preparer =
            Preparer::new(config.algorithm.wire_format()).with_target_class(config.target_class);

        Ok(Plan {
            name: config.name.clone(),
            algorithm: config.algorithm.clone(),
            preparer,
            target_class: config.target_class,
            uses_labels: config.algorithm.uses_labels(),
            root: Location::new(&config.bucket, &config.prefix),
            training_instance: config.training_instance.clone(),
            hosting_instance: config.hosting_instance.clone(),
            batches,
            runner: Runner::new().with_concurrency(config.inference.concurrency),
        })
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    fn validate_instances(&self, config: &PipelineConfig) -> Result<(), PipelineErr> {
        for (what, instance) in [
            ("training_instance", &config.training_instance),
            ("hosting_instance", &config.hosting_instance),
        ] {
            if instance.instance_count == 0 {
                return Err(PipelineErr::InvalidConfig(format!(
                    "{what}: instance_count must be greater than 0"
                )));
            }
            if instance.instance_type.is_empty() {
                return Err(PipelineErr::InvalidConfig(format!(
                    "{what}: instance_type must not be empty"
                )));
            }
        }

        Ok(())
    }

    fn validate_algorithm(
        &self,
        algorithm: &AlgorithmConfig,
        dataset: &Dataset,
    ) -> Result<(), PipelineErr> {
        if let Some(feature_dim) = algorithm.feature_dim() {
            if feature_dim != dataset.dim() {
                return Err(PipelineErr::InvalidConfig(format!(
                    "feature_dim ({feature_dim}) does not match the dataset rows ({} features)",
                    dataset.dim()
                )));
            }
        }

        if let Some(mini_batch_size) = algorithm.mini_batch_size() {
            let rows = dataset.train.len();
            if mini_batch_size == 0 || mini_batch_size > rows {
                return Err(PipelineErr::InvalidConfig(format!(
                    "mini_batch_size ({mini_batch_size}) must be in 1..={rows}, the training rows"
                )));
            }
        }

        match algorithm {
            AlgorithmConfig::LinearLearner {
                predictor_type,
                num_classes,
                ..
            } => {
                let predictor_type: PredictorType =
                    predictor_type.parse().map_err(PipelineErr::InvalidConfig)?;

                match (predictor_type, num_classes) {
                    (PredictorType::MulticlassClassifier, Some(n)) if *n >= 3 => {}
                    (PredictorType::MulticlassClassifier, _) => {
                        return Err(PipelineErr::InvalidConfig(
                            "multiclass_classifier needs num_classes of at least 3".into(),
                        ));
                    }
                    (_, Some(_)) => {
                        return Err(PipelineErr::InvalidConfig(format!(
                            "num_classes only applies to multiclass_classifier, not {predictor_type}"
                        )));
                    }
                    _ => {}
                }
            }
            AlgorithmConfig::Pca {
                feature_dim,
                num_components,
                algorithm_mode,
                ..
            } => {
                if *num_components == 0 || num_components > feature_dim {
                    return Err(PipelineErr::InvalidConfig(format!(
                        "num_components ({num_components}) must be in 1..={feature_dim}"
                    )));
                }
                if !PCA_MODES.contains(&algorithm_mode.as_str()) {
                    return Err(PipelineErr::InvalidConfig(format!(
                        "unknown algorithm_mode {algorithm_mode:?}, expected one of {PCA_MODES:?}"
                    )));
                }
            }
            AlgorithmConfig::CustomContainer { image, .. } if image.is_empty() => {
                return Err(PipelineErr::InvalidConfig("image must not be empty".into()));
            }
            AlgorithmConfig::Mxnet { entry_point, .. }
            | AlgorithmConfig::Tensorflow { entry_point, .. }
                if entry_point.is_empty() =>
            {
                return Err(PipelineErr::InvalidConfig(
                    "entry_point must not be empty".into(),
                ));
            }
            _ => {}
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Adaptation
    // -------------------------------------------------------------------------

    fn adapt_batches(
        &self,
        config: &PipelineConfig,
        dataset: &Dataset,
    ) -> Result<BatchPlan, PipelineErr> {
        let rows = dataset.test.len();
        if rows == 0 {
            return Err(PipelineErr::InvalidConfig(
                "the test partition is empty, there's nothing to predict".into(),
            ));
        }

        let plan = match (config.inference.batch_count, config.inference.max_batch_rows) {
            (Some(count), None) => BatchPlan::new(rows, count),
            (None, Some(max_rows)) => BatchPlan::with_batch_size(rows, max_rows),
            _ => {
                return Err(PipelineErr::InvalidConfig(
                    "exactly one of batch_count and max_batch_rows must be set".into(),
                ));
            }
        };

        plan.map_err(|e| PipelineErr::InvalidConfig(format!("inference: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::configs::{DatasetConfig, InferenceConfig};
    use dataset::{Partition, SplitSpec, WireFormat, loaders::CsvOptions};
    use ndarray::{Array1, Array2};

    fn sample(train: usize, test: usize, dim: usize) -> Dataset {
        let partition = |n| {
            Partition::new(
                Array2::from_shape_fn((n, dim), |(i, j)| (i + j) as f32),
                Array1::from_shape_fn(n, |i| (i % 10) as f32),
            )
            .unwrap()
        };
        Dataset::new(partition(train), Partition::empty(dim), partition(test)).unwrap()
    }

    fn config(algorithm: AlgorithmConfig) -> PipelineConfig {
        PipelineConfig {
            name: "job".into(),
            dataset: DatasetConfig::Csv {
                path: "unused.csv".into(),
                options: CsvOptions::default(),
                split: SplitSpec {
                    validation: 0.0,
                    test: 0.2,
                    shuffle: false,
                    seed: None,
                },
            },
            target_class: None,
            bucket: "bucket".into(),
            prefix: "prefix".into(),
            algorithm,
            training_instance: InstanceSpec {
                instance_type: "ml.c4.xlarge".into(),
                instance_count: 1,
            },
            hosting_instance: InstanceSpec {
                instance_type: "ml.m4.xlarge".into(),
                instance_count: 1,
            },
            inference: InferenceConfig {
                batch_count: Some(4),
                max_batch_rows: None,
                concurrency: NonZeroUsize::MIN,
            },
            store_root: "store".into(),
        }
    }

    fn linear(feature_dim: usize, predictor_type: &str, mini_batch_size: usize) -> AlgorithmConfig {
        AlgorithmConfig::LinearLearner {
            feature_dim,
            predictor_type: predictor_type.into(),
            mini_batch_size,
            num_classes: None,
        }
    }

    fn invalid(config: &PipelineConfig, dataset: &Dataset) -> String {
        match Adapter::new().adapt(config, dataset) {
            Err(PipelineErr::InvalidConfig(msg)) => msg,
            other => panic!("expected an invalid config, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_resolves_a_plan() {
        let ds = sample(100, 10, 4);
        let mut cfg = config(linear(4, "binary_classifier", 20));
        cfg.target_class = Some(3.0);

        let plan = Adapter::new().adapt(&cfg, &ds).unwrap();
        assert_eq!(plan.batches.sizes(), vec![3, 3, 2, 2]);
        assert_eq!(plan.output().to_string(), "s3://bucket/prefix/output");
        assert!(plan.uses_labels);
        assert_eq!(
            plan.preparer,
            Preparer::new(WireFormat::RecordIo).target_class(3.0)
        );
    }

    #[test]
    fn zero_instances_are_rejected() {
        let ds = sample(100, 10, 4);
        let mut cfg = config(linear(4, "binary_classifier", 20));
        cfg.hosting_instance.instance_count = 0;

        assert!(invalid(&cfg, &ds).contains("hosting_instance"));
    }

    #[test]
    fn feature_dim_must_match_dataset() {
        let ds = sample(100, 10, 4);
        let cfg = config(linear(784, "binary_classifier", 20));

        assert!(invalid(&cfg, &ds).contains("feature_dim"));
    }

    #[test]
    fn mini_batch_larger_than_training_rows() {
        let ds = sample(100, 10, 4);
        let cfg = config(linear(4, "binary_classifier", 101));

        assert!(invalid(&cfg, &ds).contains("mini_batch_size"));
    }

    #[test]
    fn unknown_predictor_type() {
        let ds = sample(100, 10, 4);
        let cfg = config(linear(4, "classifier", 20));

        assert!(invalid(&cfg, &ds).contains("predictor_type"));
    }

    #[test]
    fn multiclass_needs_classes() {
        let ds = sample(100, 10, 4);
        let cfg = config(linear(4, "multiclass_classifier", 20));
        assert!(invalid(&cfg, &ds).contains("num_classes"));

        let cfg = config(AlgorithmConfig::LinearLearner {
            feature_dim: 4,
            predictor_type: "multiclass_classifier".into(),
            mini_batch_size: 20,
            num_classes: Some(10),
        });
        assert!(Adapter::new().adapt(&cfg, &ds).is_ok());
    }

    #[test]
    fn pca_components_and_labels() {
        let ds = sample(100, 10, 4);
        let pca = |num_components| AlgorithmConfig::Pca {
            feature_dim: 4,
            num_components,
            mini_batch_size: 10,
            subtract_mean: true,
            algorithm_mode: "regular".into(),
        };

        assert!(invalid(&config(pca(5)), &ds).contains("num_components"));

        let mut cfg = config(pca(2));
        cfg.target_class = Some(1.0);
        assert!(invalid(&cfg, &ds).contains("target_class"));

        cfg.target_class = None;
        let plan = Adapter::new().adapt(&cfg, &ds).unwrap();
        assert!(!plan.uses_labels);
    }

    #[test]
    fn exactly_one_batching_option() {
        let ds = sample(100, 10, 4);
        let mut cfg = config(linear(4, "binary_classifier", 20));

        cfg.inference.max_batch_rows = NonZeroUsize::new(3);
        assert!(invalid(&cfg, &ds).contains("exactly one"));

        cfg.inference.batch_count = None;
        let plan = Adapter::new().adapt(&cfg, &ds).unwrap();
        assert_eq!(plan.batches.sizes(), vec![3, 3, 2, 2]);

        cfg.inference.max_batch_rows = None;
        assert!(invalid(&cfg, &ds).contains("exactly one"));
    }

    #[test]
    fn batch_count_larger_than_test_rows() {
        let ds = sample(100, 10, 4);
        let mut cfg = config(linear(4, "binary_classifier", 20));
        cfg.inference.batch_count = Some(11);

        assert!(invalid(&cfg, &ds).contains("inference"));
    }
}
