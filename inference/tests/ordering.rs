use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use inference::{
    PredictErr, Response, Runner, ScalarField, TextLines, VectorField, predictor_fn,
};
use ndarray::{Array2, array};
use rand::Rng;
use serde_json::json;

fn indexed_rows(n: usize, d: usize) -> Array2<f32> {
    Array2::from_shape_fn((n, d), |(i, j)| (i * d + j) as f32)
}

fn label_reply(batch: &Array2<f32>, d: usize) -> Response {
    let predictions: Vec<_> = batch
        .rows()
        .into_iter()
        .map(|row| json!({ "predicted_label": row[0] / d as f32 }))
        .collect();
    Response::Json(json!({ "predictions": predictions }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_batches_keep_row_order() {
    const ROWS: usize = 257;
    const DIM: usize = 3;

    let features = indexed_rows(ROWS, DIM);
    let in_flight = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let predictor = predictor_fn(|batch: Array2<f32>| {
        let delay = Duration::from_millis(rand::rng().random_range(0..20));
        let response = label_reply(&batch, DIM);
        let (in_flight, peak) = (&in_flight, &peak);

        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, PredictErr>(response)
        }
    });

    let runner = Runner::new().with_concurrency(NonZeroUsize::new(4).unwrap());
    let got = runner
        .run(features.view(), 16, &predictor, &ScalarField::predicted_label())
        .await
        .unwrap();

    let expected: Vec<f32> = (0..ROWS).map(|i| i as f32).collect();
    assert_eq!(got.into_vec(), expected);
    assert!(peak.load(Ordering::SeqCst) <= 4);
}

#[tokio::test]
async fn sequential_runner_calls_one_batch_at_a_time() {
    let features = indexed_rows(20, 2);
    let in_flight = AtomicUsize::new(0);
    let order = std::sync::Mutex::new(Vec::new());

    let predictor = predictor_fn(|batch: Array2<f32>| {
        let response = label_reply(&batch, 2);
        let first = batch[[0, 0]] as usize / 2;
        let (in_flight, order) = (&in_flight, &order);

        async move {
            assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
            order.lock().unwrap().push(first);
            tokio::task::yield_now().await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, PredictErr>(response)
        }
    });

    Runner::new()
        .run(features.view(), 5, &predictor, &ScalarField::predicted_label())
        .await
        .unwrap();

    assert_eq!(*order.lock().unwrap(), vec![0, 4, 8, 12, 16]);
}

#[tokio::test]
async fn projections_reshape_and_transpose() {
    let features = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];

    // Projects every row onto (sum, difference).
    let predictor = predictor_fn(|batch: Array2<f32>| {
        let projections: Vec<_> = batch
            .rows()
            .into_iter()
            .map(|r| json!({ "projection": [r[0] + r[1], r[1] - r[0]] }))
            .collect();
        async move { Ok::<_, PredictErr>(Response::Json(json!({ "projections": projections }))) }
    });

    let got = Runner::new()
        .run(features.view(), 2, &predictor, &VectorField::projection())
        .await
        .unwrap();

    assert_eq!(
        got.to_matrix().unwrap(),
        array![[3.0, 1.0], [7.0, 1.0], [11.0, 1.0]]
    );
    assert_eq!(
        got.transposed().unwrap(),
        array![[3.0, 7.0, 11.0], [1.0, 1.0, 1.0]]
    );
}

#[tokio::test]
async fn text_replies_parse_per_line() {
    let features = indexed_rows(6, 1);
    let predictor = predictor_fn(|batch: Array2<f32>| {
        let body: String = batch
            .column(0)
            .iter()
            .map(|v| if *v >= 3.0 { "1\n" } else { "0\n" })
            .collect();
        async move { Ok::<_, PredictErr>(Response::Text(body)) }
    });

    let lines = Runner::new()
        .run(features.view(), 3, &predictor, &TextLines)
        .await
        .unwrap();

    let labels = lines.parse::<f32>().unwrap();
    assert_eq!(labels.into_vec(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
}
