// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod candidates;
pub mod decoder;

pub use candidates::{
    Candidate, CandidateConfig, CandidateGenerator, ClassCandidates, generate_candidates,
};
pub use decoder::{DecoderConfig, SequenceDecoder};

/// Decoder crate name helper.
pub fn crate_name() -> &'static str {
    let _ = kpd_core::crate_name();
    "kpd-decode"
}
