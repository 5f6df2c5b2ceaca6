use std::{fmt, io, str::FromStr};

/// The content types exchanged with storage, training and hosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    RecordIoProtobuf,
    Csv,
    Json,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecordIoProtobuf => "application/x-recordio-protobuf",
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Text => "text/plain",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = io::Error;

    /// Parses a MIME type, ignoring parameters such as `; charset=utf-8`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mime = s.split(';').next().unwrap_or_default().trim();

        match mime.to_ascii_lowercase().as_str() {
            "application/x-recordio-protobuf" => Ok(Self::RecordIoProtobuf),
            "text/csv" => Ok(Self::Csv),
            "application/json" => Ok(Self::Json),
            "text/plain" => Ok(Self::Text),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported content type {other:?}"),
            )),
        }
    }
}
