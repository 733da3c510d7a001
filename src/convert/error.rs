use thiserror::Error;

use super::ValueKind;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConvertError {
    #[error("type {0} is not supported")]
    UnsupportedType(ValueKind),

    #[error("type {kind} matches several unrelated converters: {}", join_kinds(candidates))]
    AmbiguousConverter {
        kind: ValueKind,
        candidates: Vec<ValueKind>,
    },

    #[error("cannot convert '{input}' to {kind}: {reason}")]
    ConversionFailed {
        kind: ValueKind,
        input: String,
        reason: String,
    },

    #[error("cannot render {found} value with the {kind} converter")]
    Unrenderable { kind: ValueKind, found: ValueKind },

    #[error("declaring {sup} as supertype of {sub} would create a cycle")]
    SupertypeCycle { sub: ValueKind, sup: ValueKind },
}

fn join_kinds(kinds: &[ValueKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
