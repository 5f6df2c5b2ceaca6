use std::{num::NonZeroUsize, pin::pin};

use futures::{StreamExt, TryStreamExt, stream};
use log::{debug, info};
use ndarray::{ArrayView2, s};

use crate::{
    error::{InferenceErr, Result},
    extract::Extractor,
    partition::BatchPlan,
    predictions::Predictions,
    predictor::Predictor,
};

/// Drives a `Predictor` over a feature matrix one batch at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Runner {
    concurrency: NonZeroUsize,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::MIN,
        }
    }
}

impl Runner {
    /// Creates a new `Runner` predicting one batch at a time, in batch order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows up to `concurrency` predictions in flight. Results are still
    /// returned in row order.
    pub fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    /// Splits `features` into `batch_count` near equal batches and predicts them.
    ///
    /// # Arguments
    /// * `features` - The N x D rows to predict.
    /// * `batch_count` - How many calls to make, between 1 and N.
    /// * `predictor` - The prediction capability.
    /// * `extractor` - Pulls the per row results out of each reply.
    ///
    /// # Returns
    /// One result per row, in row order, or the first error. Results of batches
    /// that already succeeded are discarded on error.
    pub async fn run<P, E>(
        &self,
        features: ArrayView2<'_, f32>,
        batch_count: usize,
        predictor: &P,
        extractor: &E,
    ) -> Result<Predictions<E::Output>>
    where
        P: Predictor + ?Sized,
        E: Extractor + ?Sized,
    {
        let plan = BatchPlan::new(features.nrows(), batch_count)?;
        self.run_plan(features, plan, predictor, extractor).await
    }

    /// Same as `run` but with an explicit plan.
    ///
    /// # Errors
    /// `PlanMismatch` if `plan` wasn't built for `features.nrows()` rows, no batch is
    /// sent then.
    pub async fn run_plan<P, E>(
        &self,
        features: ArrayView2<'_, f32>,
        plan: BatchPlan,
        predictor: &P,
        extractor: &E,
    ) -> Result<Predictions<E::Output>>
    where
        P: Predictor + ?Sized,
        E: Extractor + ?Sized,
    {
        if plan.total() != features.nrows() {
            return Err(InferenceErr::PlanMismatch {
                planned: plan.total(),
                rows: features.nrows(),
            });
        }

        info!(
            rows = plan.total(),
            batches = plan.len(),
            concurrency = self.concurrency.get();
            "running batched inference"
        );

        let calls = plan.ranges().enumerate().map(|(batch, rows)| {
            let input = features.slice(s![rows.clone(), ..]).to_owned();

            async move {
                debug!(batch = batch, start = rows.start, end = rows.end; "predicting batch");

                let response =
                    predictor
                        .predict(input)
                        .await
                        .map_err(|source| InferenceErr::BatchCallFailed {
                            batch,
                            rows: rows.clone(),
                            source,
                        })?;

                let values = extractor
                    .extract(response)
                    .map_err(|msg| InferenceErr::MalformedResponse { batch, msg })?;

                if values.len() != rows.len() {
                    return Err(InferenceErr::RowCountMismatch {
                        batch,
                        got: values.len(),
                        expected: rows.len(),
                    });
                }

                Ok(values)
            }
        });

        let mut results = pin!(stream::iter(calls).buffered(self.concurrency.get()));
        let mut values = Vec::with_capacity(plan.total());

        while let Some(batch) = results.try_next().await? {
            values.extend(batch);
        }

        info!(rows = values.len(); "batched inference finished");
        Ok(Predictions::new(values))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        extract::ScalarField,
        predictor::{PredictErr, Response, predictor_fn},
    };
    use ndarray::Array2;
    use serde_json::json;

    /// Replies `{"predictions": [{"label": <first column>}, ...]}`.
    fn echo_first_column(batch: &Array2<f32>) -> Response {
        let predictions: Vec<_> = batch
            .rows()
            .into_iter()
            .map(|row| json!({ "label": row[0] }))
            .collect();
        Response::Json(json!({ "predictions": predictions }))
    }

    fn indexed_rows(n: usize, d: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, d), |(i, j)| if j == 0 { i as f32 } else { 0.5 })
    }

    #[tokio::test]
    async fn ten_rows_three_batches() {
        let features = indexed_rows(10, 4);
        let sizes = Mutex::new(Vec::new());

        let predictor = predictor_fn(|batch: Array2<f32>| {
            sizes.lock().unwrap().push(batch.nrows());
            let response = echo_first_column(&batch);
            async move { Ok::<_, PredictErr>(response) }
        });

        let got = Runner::new()
            .run(features.view(), 3, &predictor, &ScalarField::new("predictions", "label"))
            .await
            .unwrap();

        assert_eq!(*sizes.lock().unwrap(), vec![4, 3, 3]);
        assert_eq!(got.into_vec(), (0..10).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failing_batch_aborts_the_run() {
        let features = indexed_rows(9, 2);
        let calls = AtomicUsize::new(0);

        let predictor = predictor_fn(|batch: Array2<f32>| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            let response = echo_first_column(&batch);
            async move {
                if call == 1 {
                    return Err(PredictErr::from("endpoint unavailable"));
                }
                Ok(response)
            }
        });

        let err = Runner::new()
            .run(features.view(), 3, &predictor, &ScalarField::new("predictions", "label"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InferenceErr::BatchCallFailed { batch: 1, ref rows, .. } if *rows == (3..6)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn short_reply_is_a_row_count_mismatch() {
        let features = indexed_rows(4, 1);
        let predictor = predictor_fn(|_: Array2<f32>| async {
            Ok::<_, PredictErr>(Response::Json(json!({"predictions": [{"label": 1}]})))
        });

        let err = Runner::new()
            .run(features.view(), 2, &predictor, &ScalarField::new("predictions", "label"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InferenceErr::RowCountMismatch {
                batch: 0,
                got: 1,
                expected: 2
            }
        ));
    }

    #[tokio::test]
    async fn missing_field_is_malformed() {
        let features = indexed_rows(2, 1);
        let predictor = predictor_fn(|_: Array2<f32>| async {
            Ok::<_, PredictErr>(Response::Json(json!({"other": []})))
        });

        let err = Runner::new()
            .run(features.view(), 1, &predictor, &ScalarField::predicted_label())
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceErr::MalformedResponse { batch: 0, .. }));
    }

    #[tokio::test]
    async fn invalid_batch_counts_make_no_calls() {
        let calls = AtomicUsize::new(0);
        let predictor = predictor_fn(|batch: Array2<f32>| {
            calls.fetch_add(1, Ordering::SeqCst);
            let response = echo_first_column(&batch);
            async move { Ok::<_, PredictErr>(response) }
        });
        let extractor = ScalarField::new("predictions", "label");

        let empty = Array2::<f32>::zeros((0, 3));
        let err = Runner::new()
            .run(empty.view(), 1, &predictor, &extractor)
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceErr::EmptyInput));

        let features = indexed_rows(2, 3);
        let err = Runner::new()
            .run(features.view(), 3, &predictor, &extractor)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InferenceErr::InvalidBatchCount { count: 3, rows: 2 }
        ));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn plan_for_other_rows_is_rejected() {
        let calls = AtomicUsize::new(0);
        let predictor = predictor_fn(|batch: Array2<f32>| {
            calls.fetch_add(1, Ordering::SeqCst);
            let response = echo_first_column(&batch);
            async move { Ok::<_, PredictErr>(response) }
        });

        let features = indexed_rows(5, 2);
        let plan = BatchPlan::new(8, 2).unwrap();
        let err = Runner::new()
            .run_plan(
                features.view(),
                plan,
                &predictor,
                &ScalarField::new("predictions", "label"),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InferenceErr::PlanMismatch {
                planned: 8,
                rows: 5
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
