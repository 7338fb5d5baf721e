// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::candidates::{Candidate, CandidateConfig, CandidateGenerator, ClassCandidates};
use kpd_core::{
    DecodeDiagnostics, DecodedWell, Keypoint, KeypointAssignment, KpdError, ProbMatrixView,
    WellSeriesView,
};

const DEFAULT_SEARCH_WIDTH: usize = 5;
const DEFAULT_MIN_GAP: usize = 20;

/// Configuration for the constrained combination search.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DecoderConfig {
    pub candidates: CandidateConfig,
    /// Candidates per class entering the combination search.
    pub search_width: usize,
    /// Minimum sample spacing between consecutive keypoints.
    pub min_gap: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            candidates: CandidateConfig::default(),
            search_width: DEFAULT_SEARCH_WIDTH,
            min_gap: DEFAULT_MIN_GAP,
        }
    }
}

impl DecoderConfig {
    fn validate(&self) -> Result<(), KpdError> {
        self.candidates.validate()?;
        if self.search_width == 0 {
            return Err(KpdError::invalid_input(
                "DecoderConfig.search_width must be >= 1; got 0",
            ));
        }
        if self.min_gap == 0 {
            return Err(KpdError::invalid_input(
                "DecoderConfig.min_gap must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// Selects the best-scoring admissible keypoint combination for one well.
///
/// The search enumerates the top `search_width` candidates of Build and Hold
/// and the top `search_width` of Drop plus the absent-Drop branch, rejecting
/// combinations that violate ordering or the minimum gap. This is a bounded
/// search over a pruned candidate lattice, not a memoized recurrence; at the
/// default width it evaluates at most 5 x 5 x 6 combinations per well.
#[derive(Clone, Debug)]
pub struct SequenceDecoder {
    config: DecoderConfig,
}

impl SequenceDecoder {
    pub fn new(config: DecoderConfig) -> Result<Self, KpdError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes one well from pre-generated per-class candidate lists.
    ///
    /// Never fails: a class without candidates is omitted, and when no
    /// admissible combination exists each class independently falls back to
    /// its best candidate (dropping the spacing guarantees, reported via
    /// `diagnostics.fallback_used`).
    pub fn decode(&self, candidates: &ClassCandidates) -> DecodedWell {
        let width = self.config.search_width;
        let min_gap = self.config.min_gap;
        let builds = head(&candidates.build, width);
        let holds = head(&candidates.hold, width);
        let drops = head(&candidates.drop, width);

        let mut diagnostics = DecodeDiagnostics {
            candidate_counts: candidates.counts(),
            ..DecodeDiagnostics::default()
        };
        diagnostics
            .notes
            .push(format!("search_width={width}, min_gap={min_gap}"));

        let mut best: Option<(f64, KeypointAssignment)> = None;
        for build in builds {
            for hold in holds {
                if hold.position < build.position + min_gap {
                    continue;
                }
                let pair_score = build.score + hold.score;
                // Candidate lists are sorted, so enumeration order already
                // favors higher per-class scores; the absent-Drop branch
                // comes last and a strict comparison keeps the first
                // maximum.
                for drop in drops.iter().map(Some).chain(std::iter::once(None)) {
                    diagnostics.combos_considered += 1;
                    if let Some(drop) = drop
                        && drop.position < hold.position + min_gap
                    {
                        continue;
                    }
                    diagnostics.combos_admissible += 1;

                    let score = pair_score + drop.map_or(0.0, |candidate| candidate.score);
                    if best
                        .as_ref()
                        .is_none_or(|(best_score, _)| score > *best_score)
                    {
                        let mut assignment = KeypointAssignment {
                            build: Some(build.position),
                            hold: Some(hold.position),
                            drop: None,
                        };
                        if let Some(drop) = drop {
                            assignment.drop = Some(drop.position);
                        }
                        best = Some((score, assignment));
                    }
                }
            }
        }

        let assignment = match best {
            Some((score, assignment)) => {
                diagnostics
                    .notes
                    .push(format!("best_combination_score={score}"));
                assignment
            }
            None => {
                diagnostics.fallback_used = true;
                diagnostics.notes.push(
                    "no admissible combination; fell back to per-class best candidates"
                        .to_string(),
                );
                let mut assignment = KeypointAssignment::default();
                for class in Keypoint::ALL {
                    if let Some(candidate) = candidates.for_class(class).first() {
                        assignment.set(class, candidate.position);
                    }
                }
                assignment
            }
        };

        DecodedWell {
            assignment,
            diagnostics,
        }
    }

    /// Generates candidates and decodes one well in a single call, deriving
    /// prior hints from the view's prior-distance columns.
    pub fn decode_well(
        &self,
        series: &WellSeriesView<'_>,
        probs: &ProbMatrixView<'_>,
    ) -> Result<DecodedWell, KpdError> {
        let generator = CandidateGenerator::new(self.config.candidates.clone())?;
        let candidates = generator.generate_all(series, probs)?;
        Ok(self.decode(&candidates))
    }
}

fn head(candidates: &[Candidate], width: usize) -> &[Candidate] {
    &candidates[..candidates.len().min(width)]
}
