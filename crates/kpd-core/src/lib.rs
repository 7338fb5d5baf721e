// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod assignment;
pub mod error;
pub mod keypoint;
pub mod result;
pub mod series;

pub use assignment::KeypointAssignment;
pub use error::KpdError;
pub use keypoint::{CLASS_COUNT, Keypoint, NO_EVENT};
pub use result::{DecodeDiagnostics, DecodedWell};
pub use series::{NO_PRIOR_SENTINEL, ProbMatrixView, WellSeriesView};

/// Core shared types for kpd-rs.
pub fn crate_name() -> &'static str {
    "kpd-core"
}
