//! Pulling per row results out of prediction replies.

use serde_json::Value;

use crate::predictor::Response;

/// Pulls one value per predicted row out of a reply, in row order.
pub trait Extractor {
    type Output;

    /// # Errors
    /// A description of what's missing or malformed in `response`.
    fn extract(&self, response: Response) -> Result<Vec<Self::Output>, String>;
}

impl<E: Extractor + ?Sized> Extractor for &E {
    type Output = E::Output;

    fn extract(&self, response: Response) -> Result<Vec<Self::Output>, String> {
        (**self).extract(response)
    }
}

/// Reads `{"<collection>": [{"<field>": <number>}, ...]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarField {
    collection: String,
    field: String,
}

impl ScalarField {
    pub fn new(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
        }
    }

    /// Class predictions of classifiers such as the linear learner.
    pub fn predicted_label() -> Self {
        Self::new("predictions", "predicted_label")
    }

    pub fn score() -> Self {
        Self::new("predictions", "score")
    }
}

impl Extractor for ScalarField {
    type Output = f32;

    fn extract(&self, response: Response) -> Result<Vec<f32>, String> {
        let items = collection(&response, &self.collection)?;

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.get(&self.field)
                    .and_then(Value::as_f64)
                    .map(|v| v as f32)
                    .ok_or_else(|| format!("{}[{i}] has no numeric {:?}", self.collection, self.field))
            })
            .collect()
    }
}

/// Reads `{"<collection>": [{"<field>": [<number>, ...]}, ...]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorField {
    collection: String,
    field: String,
}

impl VectorField {
    pub fn new(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
        }
    }

    /// Projections of dimensionality reduction models such as PCA.
    pub fn projection() -> Self {
        Self::new("projections", "projection")
    }
}

impl Extractor for VectorField {
    type Output = Vec<f32>;

    fn extract(&self, response: Response) -> Result<Vec<Vec<f32>>, String> {
        let items = collection(&response, &self.collection)?;

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let values = item
                    .get(&self.field)
                    .and_then(Value::as_array)
                    .ok_or_else(|| format!("{}[{i}] has no array {:?}", self.collection, self.field))?;

                values
                    .iter()
                    .map(|v| v.as_f64().map(|v| v as f32))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| format!("{}[{i}].{} holds non numbers", self.collection, self.field))
            })
            .collect()
    }
}

/// One result per non blank line of a text reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextLines;

impl Extractor for TextLines {
    type Output = String;

    fn extract(&self, response: Response) -> Result<Vec<String>, String> {
        match response {
            Response::Text(body) => Ok(recordio::text::lines(&body).map(String::from).collect()),
            Response::Json(_) => Err("expected a text reply, got json".into()),
        }
    }
}

fn collection<'a>(response: &'a Response, name: &str) -> Result<&'a Vec<Value>, String> {
    match response {
        Response::Json(value) => value
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| format!("missing {name:?} array")),
        Response::Text(_) => Err("expected a json reply, got text".into()),
    }
}
