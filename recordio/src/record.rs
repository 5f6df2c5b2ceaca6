//! Protobuf messages carried inside RecordIO frames.
//!
//! Field numbers follow the platform's `Record` schema so the encoded bytes are
//! accepted by its built-in algorithms.

use std::{collections::BTreeMap, io};

use bytes::BufMut;
use prost::Message;

use crate::{Deserialize, Serialize, VALUES_KEY, frame::write_frame};

#[derive(Clone, PartialEq, prost::Message)]
pub struct Float32Tensor {
    #[prost(float, repeated, packed = "true", tag = "1")]
    pub values: Vec<f32>,
    #[prost(uint64, repeated, packed = "true", tag = "2")]
    pub keys: Vec<u64>,
    #[prost(uint64, repeated, packed = "true", tag = "3")]
    pub shape: Vec<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Float64Tensor {
    #[prost(double, repeated, packed = "true", tag = "1")]
    pub values: Vec<f64>,
    #[prost(uint64, repeated, packed = "true", tag = "2")]
    pub keys: Vec<u64>,
    #[prost(uint64, repeated, packed = "true", tag = "3")]
    pub shape: Vec<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Int32Tensor {
    #[prost(int32, repeated, packed = "true", tag = "1")]
    pub values: Vec<i32>,
    #[prost(uint64, repeated, packed = "true", tag = "2")]
    pub keys: Vec<u64>,
    #[prost(uint64, repeated, packed = "true", tag = "3")]
    pub shape: Vec<u64>,
}

/// Opaque binary values with an optional content type.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RawBytes {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub value: Vec<Vec<u8>>,
    #[prost(string, optional, tag = "2")]
    pub content_type: Option<String>,
}

/// A single named value, exactly one of the tensor kinds.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Value {
    #[prost(oneof = "value::Kind", tags = "2, 3, 7, 9")]
    pub kind: Option<value::Kind>,
}

pub mod value {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "2")]
        Float32Tensor(super::Float32Tensor),
        #[prost(message, tag = "3")]
        Float64Tensor(super::Float64Tensor),
        #[prost(message, tag = "7")]
        Int32Tensor(super::Int32Tensor),
        #[prost(message, tag = "9")]
        Bytes(super::RawBytes),
    }
}

impl Value {
    /// Creates a dense `f32` tensor value.
    pub fn float32(values: Vec<f32>) -> Self {
        Self {
            kind: Some(value::Kind::Float32Tensor(Float32Tensor {
                values,
                ..Default::default()
            })),
        }
    }

    /// Returns the values when this is an `f32` tensor.
    pub fn as_float32(&self) -> Option<&[f32]> {
        match &self.kind {
            Some(value::Kind::Float32Tensor(tensor)) => Some(&tensor.values),
            _ => None,
        }
    }
}

/// One training example: named feature tensors and named label tensors.
///
/// Maps are ordered so that encoding the same record twice yields the same bytes.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Record {
    #[prost(btree_map = "string, message", tag = "1")]
    pub features: BTreeMap<String, Value>,
    #[prost(btree_map = "string, message", tag = "2")]
    pub label: BTreeMap<String, Value>,
    #[prost(string, optional, tag = "3")]
    pub uid: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub metadata: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub configuration: Option<String>,
}

impl Record {
    /// Creates a dense record from one feature row and an optional scalar label.
    ///
    /// # Arguments
    /// * `row` - The feature values of the example.
    /// * `label` - The label of the example, if any.
    pub fn dense(row: Vec<f32>, label: Option<f32>) -> Self {
        let mut record = Self::default();
        record
            .features
            .insert(VALUES_KEY.to_string(), Value::float32(row));

        if let Some(label) = label {
            record
                .label
                .insert(VALUES_KEY.to_string(), Value::float32(vec![label]));
        }

        record
    }

    /// The dense feature values, if present.
    pub fn feature_values(&self) -> Option<&[f32]> {
        self.features.get(VALUES_KEY).and_then(Value::as_float32)
    }

    /// The dense label values, if present.
    pub fn label_values(&self) -> Option<&[f32]> {
        self.label.get(VALUES_KEY).and_then(Value::as_float32)
    }
}

impl Serialize for Record {
    fn serialize<B: BufMut>(&self, buf: &mut B) -> io::Result<()> {
        write_frame(buf, &self.encode_to_vec())
    }
}

impl<'a> Deserialize<'a> for Record {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        Record::decode(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
