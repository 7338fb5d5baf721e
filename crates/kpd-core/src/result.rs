// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::assignment::KeypointAssignment;

/// Counters and notes captured while decoding one well.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeDiagnostics {
    /// Candidates generated per class, before truncation to the search width.
    pub candidate_counts: [usize; 3],
    /// Combinations enumerated by the constrained search.
    pub combos_considered: usize,
    /// Combinations that satisfied the ordering and gap constraints.
    pub combos_admissible: usize,
    /// True when no admissible combination existed and the per-class
    /// fallback produced the assignment.
    pub fallback_used: bool,
    pub notes: Vec<String>,
}

/// Decoded assignment for one well plus its diagnostics.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedWell {
    pub assignment: KeypointAssignment,
    pub diagnostics: DecodeDiagnostics,
}
