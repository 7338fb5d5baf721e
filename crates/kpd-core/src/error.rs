// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors surfaced by keypoint decoding, fusion, and evaluation.
///
/// Missing candidates and infeasible orderings are not errors: the decoder
/// degrades to partial or fallback assignments and reports them through
/// diagnostics instead.
#[derive(Debug, Error)]
pub enum KpdError {
    /// Shape, range, or configuration contract violation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Per-well position indices are not contiguous depth order.
    #[error("malformed sequence: {0}")]
    MalformedSequence(String),
    /// A fusion weight and a probability source do not pair up.
    #[error("missing probability source: {0}")]
    MissingSource(String),
}

impl KpdError {
    /// Constructs an [`KpdError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Constructs an [`KpdError::MalformedSequence`].
    pub fn malformed_sequence(message: impl Into<String>) -> Self {
        Self::MalformedSequence(message.into())
    }

    /// Constructs an [`KpdError::MissingSource`].
    pub fn missing_source(message: impl Into<String>) -> Self {
        Self::MissingSource(message.into())
    }
}
