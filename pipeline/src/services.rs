//! The managed services a pipeline talks to.

use std::{collections::BTreeMap, future::Future, io};

use dataset::{PartitionKind, WireBuffer};
use inference::Predictor;
use recordio::ContentType;

use crate::{configs::{AlgorithmConfig, InstanceSpec}, error::ServiceErr, location::Location};

/// Durable storage for datasets and model artifacts.
pub trait ObjectStore {
    /// Stores the whole buffer at `location`.
    ///
    /// # Returns
    /// Where the object ended up.
    fn upload(
        &self,
        buffer: &WireBuffer,
        location: &Location,
    ) -> impl Future<Output = io::Result<Location>>;

    fn download(&self, location: &Location) -> impl Future<Output = io::Result<Vec<u8>>>;
}

/// An uploaded partition handed to a training job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub kind: PartitionKind,
    pub location: Location,
    pub content_type: ContentType,
    pub rows: usize,
}

/// Everything a training service needs to train a model.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingJob {
    pub name: String,
    pub algorithm: AlgorithmConfig,
    pub hyperparameters: BTreeMap<String, String>,
    pub channels: Vec<Channel>,
    pub output: Location,
    pub instance: InstanceSpec,
}

/// A trained model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    pub name: String,
    pub artifacts: Location,
}

/// A deployed, billable endpoint. It has to be deleted once done with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointHandle {
    pub name: String,
}

/// Trains models and hosts them behind endpoints.
pub trait TrainingService {
    type Endpoint: Predictor;

    /// Runs `job` to completion.
    fn train(&self, job: &TrainingJob) -> impl Future<Output = Result<ModelHandle, ServiceErr>>;

    /// Hosts `model` on `instance` and waits until it's in service.
    fn deploy(
        &self,
        model: &ModelHandle,
        instance: &InstanceSpec,
    ) -> impl Future<Output = Result<EndpointHandle, ServiceErr>>;

    /// A predictor sending requests to a deployed endpoint.
    fn endpoint(&self, handle: &EndpointHandle) -> Self::Endpoint;

    fn delete_endpoint(
        &self,
        handle: &EndpointHandle,
    ) -> impl Future<Output = Result<(), ServiceErr>>;
}
