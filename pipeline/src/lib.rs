pub mod configs;
pub mod error;
mod evaluation;
mod location;
pub mod services;
mod session;
mod store;

use configs::{Adapter, PipelineConfig};
use services::{ObjectStore, TrainingService};

pub use error::{PipelineErr, Result};
pub use evaluation::{Evaluation, evaluate_labels};
pub use location::Location;
pub use session::{Outcome, Report, Session, training_job, upload, upload_channels};
pub use store::LocalStore;

/// Runs a whole pipeline: loads the dataset, uploads it, trains, deploys,
/// predicts the test partition and tears the endpoint down.
///
/// # Errors
/// Returns a `PipelineErr` if the config is invalid or any stage fails.
pub fn run_pipeline<S, O>(config: &PipelineConfig, service: S, store: O) -> Result<Report>
where
    S: TrainingService,
    O: ObjectStore,
{
    log::info!("loading dataset");
    let (dataset, _) = config.dataset.load()?;

    log::info!("adapting config");
    let plan = Adapter::new().adapt(config, &dataset)?;

    let session = Session::new(service, store)?;
    session.run(&dataset, &plan)
}
