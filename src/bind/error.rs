use thiserror::Error;

use super::FailureReport;
use crate::convert::{ConvertError, ValueKind};

/// Why a single field could not be bound or dumped.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum FieldError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("field of type {expected} cannot hold a {found} value")]
    Unassignable { expected: ValueKind, found: ValueKind },

    #[error("nested settings failed: {0}")]
    NestedBindFailed(Box<FailureReport>),

    #[error("{0} is nested inside itself")]
    CyclicNesting(&'static str),
}
