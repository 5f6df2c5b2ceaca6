use dataset::{Dataset, PartitionKind, WireBuffer, WireFormat, binary_remap};
use inference::{
    BatchPlan, Extractor, InferenceErr, Predictions, Runner, ScalarField, TextLines, VectorField,
};
use log::{info, warn};
use ndarray::{Array2, ArrayView2};
use tokio::{io, runtime::Runtime};

use crate::{
    configs::{AlgorithmConfig, InstanceSpec, Plan, PredictorType},
    error::{PipelineErr, Result},
    evaluation::{Evaluation, evaluate_labels},
    location::Location,
    services::{Channel, EndpointHandle, ModelHandle, ObjectStore, TrainingJob, TrainingService},
};

/// What an endpoint predicted for the test partition.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// One class per row.
    Labels(Predictions<f32>),
    /// One regression score per row.
    Scores(Predictions<f32>),
    /// One projected row per row, N x K.
    Projections(Array2<f32>),
}

/// The result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct Report {
    pub model: ModelHandle,
    pub endpoint: EndpointHandle,
    pub outcome: Outcome,
    /// Only for classifiers.
    pub evaluation: Option<Evaluation<i64>>,
}

/// Drives a training service and an object store from synchronous code.
///
/// Every stage blocks until done. Deployed endpoints keep costing money until
/// `delete_endpoint` is called.
pub struct Session<S, O> {
    runtime: Runtime,
    service: S,
    store: O,
}

impl<S: TrainingService, O: ObjectStore> Session<S, O> {
    /// Creates a new `Session`.
    ///
    /// # Errors
    /// An io error if the async runtime can't be started.
    pub fn new(service: S, store: O) -> io::Result<Self> {
        let runtime = Runtime::new()?;
        Ok(Self {
            runtime,
            service,
            store,
        })
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn store(&self) -> &O {
        &self.store
    }

    /// Uploads a single buffer.
    pub fn upload(&self, buffer: &WireBuffer, location: &Location) -> Result<Location> {
        self.runtime.block_on(upload(&self.store, buffer, location))
    }

    /// Prepares and uploads the train and validation partitions.
    pub fn upload_dataset(&self, dataset: &Dataset, plan: &Plan) -> Result<Vec<Channel>> {
        self.runtime
            .block_on(upload_channels(&self.store, dataset, plan))
    }

    /// Trains a model and waits for it.
    pub fn train(&self, job: &TrainingJob) -> Result<ModelHandle> {
        info!(job = job.name.as_str(), algorithm = job.algorithm.name(); "training started");

        let model = self
            .runtime
            .block_on(self.service.train(job))
            .map_err(|source| PipelineErr::Service { op: "train", source })?;

        info!(model = model.name.as_str(); "training finished, artifacts at {}", model.artifacts);
        Ok(model)
    }

    pub fn deploy(&self, model: &ModelHandle, instance: &InstanceSpec) -> Result<EndpointHandle> {
        info!(
            model = model.name.as_str(),
            instance_type = instance.instance_type.as_str(),
            instance_count = instance.instance_count;
            "deploying endpoint"
        );

        let endpoint = self
            .runtime
            .block_on(self.service.deploy(model, instance))
            .map_err(|source| PipelineErr::Service { op: "deploy", source })?;

        info!(endpoint = endpoint.name.as_str(); "endpoint in service");
        Ok(endpoint)
    }

    /// Predicts `features` through a deployed endpoint, batch by batch.
    pub fn predict<E>(
        &self,
        endpoint: &EndpointHandle,
        features: ArrayView2<'_, f32>,
        batches: BatchPlan,
        runner: &Runner,
        extractor: &E,
    ) -> Result<Predictions<E::Output>>
    where
        E: Extractor + ?Sized,
    {
        let predictor = self.service.endpoint(endpoint);
        let predictions = self
            .runtime
            .block_on(runner.run_plan(features, batches, &predictor, extractor))?;

        Ok(predictions)
    }

    pub fn delete_endpoint(&self, endpoint: &EndpointHandle) -> Result<()> {
        self.runtime
            .block_on(self.service.delete_endpoint(endpoint))
            .map_err(|source| PipelineErr::Service {
                op: "delete_endpoint",
                source,
            })?;

        info!(endpoint = endpoint.name.as_str(); "endpoint deleted");
        Ok(())
    }

    /// Uploads, trains, deploys, predicts the test partition and deletes the endpoint.
    ///
    /// The endpoint is deleted even if inference fails, in which case the
    /// inference error is returned.
    pub fn run(&self, dataset: &Dataset, plan: &Plan) -> Result<Report> {
        let channels = self.upload_dataset(dataset, plan)?;
        let model = self.train(&training_job(plan, channels))?;
        let endpoint = self.deploy(&model, &plan.hosting_instance)?;

        let outcome = self.predict_test(&endpoint, dataset.test.features(), plan);

        if let Err(e) = self.delete_endpoint(&endpoint) {
            warn!(endpoint = endpoint.name.as_str(); "failed to delete endpoint: {e}");
        }

        let outcome = outcome?;
        let evaluation = match &outcome {
            Outcome::Labels(predicted) => {
                let actual = match plan.target_class {
                    Some(target) => binary_remap(dataset.test.labels(), target),
                    None => dataset.test.labels().to_owned(),
                };
                let evaluation = evaluate_labels(actual.view(), predicted)?;
                info!(accuracy = evaluation.accuracy(); "test partition evaluated");
                Some(evaluation)
            }
            _ => None,
        };

        Ok(Report {
            model,
            endpoint,
            outcome,
            evaluation,
        })
    }

    fn predict_test(
        &self,
        endpoint: &EndpointHandle,
        features: ArrayView2<'_, f32>,
        plan: &Plan,
    ) -> Result<Outcome> {
        let predict = |extractor: &ScalarField| {
            self.predict(endpoint, features, plan.batches, &plan.runner, extractor)
        };

        match &plan.algorithm {
            AlgorithmConfig::LinearLearner { predictor_type, .. }
                if predictor_type.parse::<PredictorType>() == Ok(PredictorType::Regressor) =>
            {
                Ok(Outcome::Scores(predict(&ScalarField::score())?))
            }
            AlgorithmConfig::Pca { .. } => {
                let projections = self.predict(
                    endpoint,
                    features,
                    plan.batches,
                    &plan.runner,
                    &VectorField::projection(),
                )?;
                Ok(Outcome::Projections(projections.to_matrix()?))
            }
            AlgorithmConfig::CustomContainer { .. } => {
                let lines =
                    self.predict(endpoint, features, plan.batches, &plan.runner, &TextLines)?;

                let labels = lines.parse::<f32>().map_err(|(row, text)| {
                    let batch = plan
                        .batches
                        .ranges()
                        .position(|rows| rows.contains(&row))
                        .unwrap_or_default();
                    InferenceErr::MalformedResponse {
                        batch,
                        msg: format!("row {row}: {text:?} isn't a numeric label"),
                    }
                })?;
                Ok(Outcome::Labels(labels))
            }
            _ => Ok(Outcome::Labels(predict(&ScalarField::predicted_label())?)),
        }
    }
}

/// The object name a partition is stored under.
fn object_name(format: WireFormat) -> &'static str {
    match format {
        WireFormat::RecordIo => "recordio-pb-data",
        WireFormat::Csv => "data.csv",
    }
}

/// Builds the training job for the uploaded `channels`.
pub fn training_job(plan: &Plan, channels: Vec<Channel>) -> TrainingJob {
    TrainingJob {
        name: plan.name.clone(),
        algorithm: plan.algorithm.clone(),
        hyperparameters: plan.algorithm.hyperparameters(),
        channels,
        output: plan.output(),
        instance: plan.training_instance.clone(),
    }
}

/// Uploads `buffer`, attaching the location to any failure.
pub async fn upload<O: ObjectStore>(
    store: &O,
    buffer: &WireBuffer,
    location: &Location,
) -> Result<Location> {
    let stored = store
        .upload(buffer, location)
        .await
        .map_err(|source| PipelineErr::Storage {
            location: location.clone(),
            source,
        })?;

    info!(
        rows = buffer.rows(),
        bytes = buffer.len(),
        content_type = buffer.content_type().as_str();
        "uploaded {stored}"
    );

    Ok(stored)
}

/// Prepares the train and validation partitions as `plan` says and uploads them,
/// skipping empty ones.
pub async fn upload_channels<O: ObjectStore>(
    store: &O,
    dataset: &Dataset,
    plan: &Plan,
) -> Result<Vec<Channel>> {
    let mut channels = Vec::new();

    for kind in [PartitionKind::Train, PartitionKind::Validation] {
        let partition = dataset.get(kind);
        if partition.is_empty() {
            continue;
        }

        let buffer = if plan.uses_labels {
            plan.preparer.prepare_partition(partition)?
        } else {
            plan.preparer.prepare_features(partition.features())?
        };

        let location = plan
            .root
            .join(kind.as_str())
            .join(object_name(buffer.format()));
        let location = upload(store, &buffer, &location).await?;

        channels.push(Channel {
            kind,
            location,
            content_type: buffer.content_type(),
            rows: buffer.rows(),
        });
    }

    Ok(channels)
}
