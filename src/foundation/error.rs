use crate::foundation::core::Shape4;

/// Convenience result type used across the crate.
pub type NetResult<T> = Result<T, NetError>;

/// Crate-level error taxonomy.
///
/// Every variant is fatal for the construction or forward call that raised it; nothing in the
/// crate retries or degrades numerically to recover.
#[derive(thiserror::Error, Debug)]
pub enum NetError {
    /// Bad block grammar, misplaced `evenize`, or a channel plan that does not fit the block.
    #[error("malformed spec '{spec}': {message}")]
    MalformedSpec {
        /// The offending spec string.
        spec: String,
        /// What went wrong.
        message: String,
    },

    /// A decoder contribution drifted from the encoder-recorded shape by more than one unit.
    #[error("shape reconciliation error at level {level}: expected {expected}, found {found}")]
    ShapeReconciliation {
        /// Pyramid level index.
        level: usize,
        /// Shape recorded by the encoder.
        expected: Shape4,
        /// Shape of the vertical contribution.
        found: Shape4,
    },

    /// The decoder needed a shape record the table does not have.
    #[error("missing shape record for level {level}")]
    MissingShapeRecord {
        /// Pyramid level index.
        level: usize,
    },

    /// Pixel-shuffle upsampling on a channel count not divisible by 4.
    #[error("pixel-shuffle upsampling needs a channel count divisible by 4, got {channels}")]
    UnsupportedUpsampleChannelCount {
        /// Offending channel count.
        channels: usize,
    },

    /// Operand shapes that cannot be combined.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Invalid configuration or input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or ill-shaped named parameter.
    #[error("parameter error: {0}")]
    Params(String),

    /// JSON encoding/decoding failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, with its source preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NetError {
    /// Build a [`NetError::MalformedSpec`].
    pub fn malformed_spec(spec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedSpec {
            spec: spec.into(),
            message: message.into(),
        }
    }

    /// Build a [`NetError::ShapeMismatch`].
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Build a [`NetError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`NetError::Params`].
    pub fn params(msg: impl Into<String>) -> Self {
        Self::Params(msg.into())
    }

    /// Build a [`NetError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
