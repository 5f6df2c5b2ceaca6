use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::PipelineErr;

const SCHEME: &str = "s3://";

/// An object address, `s3://<bucket>/<key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub bucket: String,
    pub key: String,
}

impl Location {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into().trim_matches('/').to_string(),
        }
    }

    /// Appends `segment` to the key, separated by a single `/`.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.trim_matches('/');
        let key = match (self.key.is_empty(), segment.is_empty()) {
            (true, _) => segment.to_string(),
            (false, true) => self.key.clone(),
            (false, false) => format!("{}/{segment}", self.key),
        };

        Self {
            bucket: self.bucket.clone(),
            key,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}", self.bucket, self.key)
    }
}

impl FromStr for Location {
    type Err = PipelineErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| PipelineErr::InvalidConfig(format!("{s:?} isn't an {SCHEME} location")))?;

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(PipelineErr::InvalidConfig(format!("{s:?} has no bucket")));
        }

        Ok(Self::new(bucket, key))
    }
}
