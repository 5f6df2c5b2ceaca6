//! The prediction capability the runner drives, and the replies it gets back.

use std::{error::Error, future::Future, io};

use ndarray::Array2;
use recordio::ContentType;
use serde_json::Value;

/// Whatever went wrong inside a single prediction call.
pub type PredictErr = Box<dyn Error + Send + Sync>;

/// A decoded prediction reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Json(Value),
    Text(String),
}

impl Response {
    /// Decodes a reply body according to its content type.
    ///
    /// JSON bodies are parsed, CSV and plain text bodies are kept as text.
    pub fn from_body(content_type: &str, body: &[u8]) -> Result<Self, PredictErr> {
        match content_type.parse::<ContentType>()? {
            ContentType::Json => Ok(Self::Json(serde_json::from_slice(body)?)),
            ContentType::Csv | ContentType::Text => Ok(Self::Text(String::from_utf8(body.to_vec())?)),
            other => Err(Box::new(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("can't decode a {other} reply"),
            ))),
        }
    }
}

/// Something able to predict a batch of rows, usually a hosted endpoint.
pub trait Predictor {
    /// Predicts every row of `batch`.
    fn predict(&self, batch: Array2<f32>) -> impl Future<Output = Result<Response, PredictErr>>;
}

impl<P: Predictor + ?Sized> Predictor for &P {
    fn predict(&self, batch: Array2<f32>) -> impl Future<Output = Result<Response, PredictErr>> {
        (**self).predict(batch)
    }
}

/// A `Predictor` backed by a closure.
#[derive(Debug, Clone, Copy)]
pub struct FnPredictor<F>(F);

/// Wraps `f` into a `Predictor`, handy for in-process models and mocks.
pub fn predictor_fn<F, Fut>(f: F) -> FnPredictor<F>
where
    F: Fn(Array2<f32>) -> Fut,
    Fut: Future<Output = Result<Response, PredictErr>>,
{
    FnPredictor(f)
}

impl<F, Fut> Predictor for FnPredictor<F>
where
    F: Fn(Array2<f32>) -> Fut,
    Fut: Future<Output = Result<Response, PredictErr>>,
{
    fn predict(&self, batch: Array2<f32>) -> impl Future<Output = Result<Response, PredictErr>> {
        (self.0)(batch)
    }
}

/// The raw request and reply exchange with an endpoint.
pub trait Invoke {
    /// Sends `body` and returns the reply's content type and body.
    fn invoke(
        &self,
        content_type: ContentType,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(String, Vec<u8>), PredictErr>>;
}

/// A `Predictor` encoding each batch before handing it to an `Invoke` transport.
#[derive(Debug, Clone)]
pub struct InvokePredictor<T> {
    transport: T,
    request: ContentType,
}

impl<T: Invoke> InvokePredictor<T> {
    /// Sends batches as headerless CSV rows, the contract of custom containers.
    pub fn csv(transport: T) -> Self {
        Self {
            transport,
            request: ContentType::Csv,
        }
    }

    /// Sends batches as RecordIO dense records without labels.
    pub fn recordio(transport: T) -> Self {
        Self {
            transport,
            request: ContentType::RecordIoProtobuf,
        }
    }

    pub fn request_type(&self) -> ContentType {
        self.request
    }

    fn encode(&self, batch: &Array2<f32>) -> io::Result<Vec<u8>> {
        match self.request {
            ContentType::RecordIoProtobuf => {
                Ok(recordio::encode_dense(batch.view(), None)?.to_vec())
            }
            _ => Ok(recordio::csv::write_rows(batch.view(), None)?.into_bytes()),
        }
    }
}

impl<T: Invoke> Predictor for InvokePredictor<T> {
    async fn predict(&self, batch: Array2<f32>) -> Result<Response, PredictErr> {
        let body = self.encode(&batch)?;
        let (content_type, reply) = self.transport.invoke(self.request, body).await?;
        Response::from_body(&content_type, &reply)
    }
}
