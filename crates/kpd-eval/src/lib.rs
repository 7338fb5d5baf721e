// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use kpd_core::{CLASS_COUNT, Keypoint, KpdError, NO_EVENT};
use std::collections::HashMap;

const DEFAULT_BUILD_TOLERANCE: usize = 1;
const DEFAULT_REST_TOLERANCE: usize = 2;

/// Positional tolerance windows for near-miss forgiveness.
///
/// The build point is graded tighter than the hold and drop points.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tolerance {
    /// Window for the build point.
    pub build: usize,
    /// Window for the hold and drop points.
    pub rest: usize,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            build: DEFAULT_BUILD_TOLERANCE,
            rest: DEFAULT_REST_TOLERANCE,
        }
    }
}

impl Tolerance {
    /// Window applied to one class.
    pub fn for_class(&self, class: Keypoint) -> usize {
        match class {
            Keypoint::Build => self.build,
            Keypoint::Hold | Keypoint::Drop => self.rest,
        }
    }
}

/// Precision/recall/F1 summary for one label class.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClassF1 {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Tolerance-adjusted macro-F1 with its per-class breakdown.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ToleranceF1 {
    /// Per-class scores over {no-event, build, hold, drop}.
    pub per_class: [ClassF1; CLASS_COUNT],
    /// Mean of the four per-class F1 scores.
    pub macro_f1: f64,
    /// Predictions relocated onto their true position by forgiveness.
    pub forgiven: usize,
}

/// Computes the tolerance-adjusted macro-F1 over classes {0,1,2,3}.
///
/// Per well and keypoint class, the first true and first predicted
/// occurrence are located; a prediction within the class's tolerance window
/// of the truth is relocated onto the true position before scoring, so
/// near misses grade as exact matches. Under-tolerance predictions score as
/// a miss at the true position plus a false positive at the predicted one.
pub fn macro_f1_with_tolerance(
    truth: &[u8],
    predicted: &[u8],
    well_ids: &[u64],
    tolerance: &Tolerance,
) -> Result<f64, KpdError> {
    tolerance_f1(truth, predicted, well_ids, tolerance).map(|scores| scores.macro_f1)
}

/// Full-breakdown form of [`macro_f1_with_tolerance`].
pub fn tolerance_f1(
    truth: &[u8],
    predicted: &[u8],
    well_ids: &[u64],
    tolerance: &Tolerance,
) -> Result<ToleranceF1, KpdError> {
    validate_labelings(truth, predicted, well_ids)?;

    let (adjusted, forgiven) = apply_tolerance(truth, predicted, well_ids, tolerance);

    let mut per_class = [ClassF1::default(); CLASS_COUNT];
    let mut macro_sum = 0.0;
    for (label, slot) in per_class.iter_mut().enumerate() {
        *slot = class_f1(truth, &adjusted, label as u8);
        macro_sum += slot.f1;
    }

    Ok(ToleranceF1 {
        per_class,
        macro_f1: macro_sum / CLASS_COUNT as f64,
        forgiven,
    })
}

/// Applies forgiveness and returns the adjusted prediction vector plus the
/// number of relocated predictions.
fn apply_tolerance(
    truth: &[u8],
    predicted: &[u8],
    well_ids: &[u64],
    tolerance: &Tolerance,
) -> (Vec<u8>, usize) {
    let mut adjusted = predicted.to_vec();
    let mut forgiven = 0;

    for rows in group_rows(well_ids) {
        for class in Keypoint::ALL {
            let label = class.label();
            // First occurrence on each side; uniqueness is an upstream
            // guarantee, not a precondition.
            let true_pos = rows.iter().copied().find(|&row| truth[row] == label);
            let pred_pos = rows.iter().copied().find(|&row| predicted[row] == label);
            let (Some(true_pos), Some(pred_pos)) = (true_pos, pred_pos) else {
                continue;
            };

            if true_pos.abs_diff(pred_pos) <= tolerance.for_class(class) {
                adjusted[pred_pos] = NO_EVENT;
                adjusted[true_pos] = label;
                if true_pos != pred_pos {
                    forgiven += 1;
                }
            }
        }
    }

    (adjusted, forgiven)
}

/// Groups row indices by well id, preserving encounter order.
fn group_rows(well_ids: &[u64]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slots: HashMap<u64, usize> = HashMap::new();
    for (row, &well_id) in well_ids.iter().enumerate() {
        let slot = *slots.entry(well_id).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }
    groups
}

fn class_f1(truth: &[u8], predicted: &[u8], label: u8) -> ClassF1 {
    let mut true_positives = 0;
    let mut false_positives = 0;
    let mut false_negatives = 0;
    for (&actual, &guess) in truth.iter().zip(predicted) {
        match (actual == label, guess == label) {
            (true, true) => true_positives += 1,
            (false, true) => false_positives += 1,
            (true, false) => false_negatives += 1,
            (false, false) => {}
        }
    }

    let precision = ratio(true_positives, true_positives + false_positives);
    let recall = ratio(true_positives, true_positives + false_negatives);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    ClassF1 {
        true_positives,
        false_positives,
        false_negatives,
        precision,
        recall,
        f1,
    }
}

/// Zero-division convention: an undefined ratio scores 0.
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn validate_labelings(truth: &[u8], predicted: &[u8], well_ids: &[u64]) -> Result<(), KpdError> {
    let n = truth.len();
    if n == 0 {
        return Err(KpdError::invalid_input(
            "label vectors must contain >= 1 sample",
        ));
    }
    if predicted.len() != n || well_ids.len() != n {
        return Err(KpdError::invalid_input(format!(
            "label vector length mismatch: truth={n}, predicted={}, well_ids={}",
            predicted.len(),
            well_ids.len()
        )));
    }
    for (name, labels) in [("truth", truth), ("predicted", predicted)] {
        if let Some((row, &label)) = labels
            .iter()
            .enumerate()
            .find(|&(_, &label)| usize::from(label) >= CLASS_COUNT)
        {
            return Err(KpdError::invalid_input(format!(
                "{name} labels must be in 0..=3; row {row} has {label}"
            )));
        }
    }
    Ok(())
}

/// Evaluation crate name helper.
pub fn crate_name() -> &'static str {
    let _ = kpd_core::crate_name();
    "kpd-eval"
}
