//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};

use kiddo_common::QueueError;
use kiddo_domain::KiddoError;
use serde_json::Error as JsonError;
use toml::de::Error as TomlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct InfraError(pub KiddoError);

impl From<InfraError> for KiddoError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<KiddoError> for InfraError {
    fn from(value: KiddoError) -> Self {
        InfraError(value)
    }
}

trait IntoKiddoError {
    fn into_kiddo(self) -> KiddoError;
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → KiddoError */
/* -------------------------------------------------------------------------- */

impl IntoKiddoError for IoError {
    fn into_kiddo(self) -> KiddoError {
        match self.kind() {
            ErrorKind::NotFound => KiddoError::NotFound(self.to_string()),
            ErrorKind::TimedOut => KiddoError::Timeout(self.to_string()),
            ErrorKind::InvalidData | ErrorKind::InvalidInput => {
                KiddoError::InvalidInput(self.to_string())
            }
            _ => KiddoError::Io(self.to_string()),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_kiddo())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → KiddoError */
/* -------------------------------------------------------------------------- */

impl IntoKiddoError for JsonError {
    fn into_kiddo(self) -> KiddoError {
        if self.is_io() {
            KiddoError::Io(self.to_string())
        } else {
            KiddoError::InvalidInput(format!("malformed JSON at line {}: {self}", self.line()))
        }
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_kiddo())
    }
}

/* -------------------------------------------------------------------------- */
/* toml::de::Error → KiddoError */
/* -------------------------------------------------------------------------- */

impl IntoKiddoError for TomlError {
    fn into_kiddo(self) -> KiddoError {
        KiddoError::Config(format!("Invalid TOML format: {}", self.message()))
    }
}

impl From<TomlError> for InfraError {
    fn from(value: TomlError) -> Self {
        InfraError(value.into_kiddo())
    }
}

/* -------------------------------------------------------------------------- */
/* QueueError → KiddoError */
/* -------------------------------------------------------------------------- */

impl IntoKiddoError for QueueError {
    fn into_kiddo(self) -> KiddoError {
        match self {
            QueueError::Common(common) => KiddoError::Config(format!("invalid queue settings: {common}")),
            other => KiddoError::Queue(other.to_string()),
        }
    }
}

impl From<QueueError> for InfraError {
    fn from(value: QueueError) -> Self {
        InfraError(value.into_kiddo())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
