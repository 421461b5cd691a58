use crate::types::ValueKind;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PackError>;

/// Failure taxonomy for [`pack`](crate::pack) and [`unpack`](crate::unpack).
///
/// "Not applicable" outcomes of individual candidate encoders never surface
/// here; those are designed fallthrough inside the dispatch chain. Every
/// variant below is final for the call. Delegate failures keep their own
/// variants so callers can tell an input problem from a library problem.
#[derive(Debug, Error)]
pub enum PackError {
    /// No candidate encoder applied and the unsafe fallback was not enabled.
    #[error("cannot safely pack {kind} value: {reason}")]
    Unsupported { kind: ValueKind, reason: String },

    /// The opaque fallback needed its extended protocol, which cannot
    /// promise byte-stable output, while the caller required determinism.
    #[error("cannot serialize deterministically: {0}")]
    Nondeterminism(String),

    /// The opaque value's type has no capsule codec registered.
    #[error("unpicklable value of type {type_name}: no capsule codec is registered for it")]
    Unpicklable { type_name: String },

    /// A recognized tag whose payload fails structural parsing. The engine
    /// does not attempt partial recovery.
    #[error("malformed blob: {0}")]
    Malformed(String),

    /// Value nesting beyond the configured limit, on encode or decode.
    #[error("value nesting exceeds the depth limit of {max}")]
    DepthLimit { max: usize },

    #[error("envelope delegate failed: {0}")]
    Envelope(#[from] lz4_flex::frame::Error),

    #[error("compact delegate failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document delegate failed: {0}")]
    Document(#[from] bson::ser::Error),

    #[error("capsule delegate failed: {0}")]
    Capsule(#[from] bincode::Error),

    #[error("columnar delegate failed: {0}")]
    Columnar(#[from] arrow::error::ArrowError),

    #[error("columnar file delegate failed: {0}")]
    ColumnarFile(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
