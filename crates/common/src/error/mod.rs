//! Shared error vocabulary.
//!
//! [`ErrorClassification`] gives callers one way to ask any error whether a
//! retry can help and how loudly it should be logged. Module errors embed
//! [`CommonError`] as a transparent variant and derive their classification
//! with [`impl_error_classification!`](crate::impl_error_classification):
//!
//! ```rust,ignore
//! #[derive(Debug, thiserror::Error)]
//! pub enum OutboxError {
//!     #[error("Outbox full")]
//!     Full,
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//!
//! impl_error_classification!(OutboxError, Common,
//!     Self::Full => {
//!         retryable: true,
//!         severity: ErrorSeverity::Warning,
//!         critical: false,
//!     }
//! );
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result alias over [`CommonError`]
pub type CommonResult<T> = Result<T, CommonError>;

/// Failures shared by more than one module
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    /// A configuration value was rejected
    #[error("Configuration error in '{field}': {message}")]
    Config { field: String, message: String },
}

impl CommonError {
    /// Reject the value of `field`
    pub fn config<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Config { field: field.into(), message: message.into() }
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Retry and alerting semantics of an error
pub trait ErrorClassification {
    /// Whether the same call may succeed later
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    /// Whether the failure points at a broken invariant
    fn is_critical(&self) -> bool;

    /// Suggested delay before retrying
    fn retry_after(&self) -> Option<Duration>;
}

/// Severity scale shared by logs and alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Implement [`ErrorClassification`] for an error that embeds [`CommonError`].
///
/// The embedded variant delegates; every other variant is listed with its
/// classification. `retry_after` defaults to `None` when omitted.
#[macro_export]
macro_rules! impl_error_classification {
    (
        $error_type:ty,
        $common_variant:ident
        $(,
            $variant:pat => {
                retryable: $retryable:expr,
                severity: $severity:expr,
                critical: $critical:expr
                $(, retry_after: $retry_after:expr)?
                $(,)?
            }
        )*
        $(,)?
    ) => {
        impl $crate::error::ErrorClassification for $error_type {
            fn is_retryable(&self) -> bool {
                match self {
                    Self::$common_variant(e) => e.is_retryable(),
                    $($variant => $retryable,)*
                }
            }

            fn severity(&self) -> $crate::error::ErrorSeverity {
                match self {
                    Self::$common_variant(e) => e.severity(),
                    $($variant => $severity,)*
                }
            }

            fn is_critical(&self) -> bool {
                match self {
                    Self::$common_variant(e) => e.is_critical(),
                    $($variant => $critical,)*
                }
            }

            fn retry_after(&self) -> Option<std::time::Duration> {
                match self {
                    Self::$common_variant(e) => e.retry_after(),
                    $($($variant => $retry_after,)?)*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }
    };
}
