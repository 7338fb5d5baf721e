// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::error::KpdError;
use crate::keypoint::{CLASS_COUNT, Keypoint};

/// Prior-distance value marking a sample with no usable design prior.
pub const NO_PRIOR_SENTINEL: f64 = 999.0;

/// Zero-copy view of one well's depth-ordered samples.
///
/// Sample order IS depth order; the core never re-sorts. The optional
/// per-class prior-distance columns hold, for each sample, its distance to
/// the design-derived prior position of that class, or
/// [`NO_PRIOR_SENTINEL`] when no prior is available.
#[derive(Clone, Copy, Debug)]
pub struct WellSeriesView<'a> {
    inclination: &'a [f64],
    prior_distance: [Option<&'a [f64]>; 3],
}

impl<'a> WellSeriesView<'a> {
    /// Constructs a validated view over one well.
    pub fn new(
        inclination: &'a [f64],
        prior_distance: [Option<&'a [f64]>; 3],
    ) -> Result<Self, KpdError> {
        let n = inclination.len();
        if n == 0 {
            return Err(KpdError::invalid_input("well length must be >= 1"));
        }
        if let Some((idx, value)) = first_non_finite(inclination) {
            return Err(KpdError::invalid_input(format!(
                "inclination must be finite: sample {idx} is {value}"
            )));
        }

        for kp in Keypoint::ALL {
            let Some(column) = prior_distance[kp.slot()] else {
                continue;
            };
            if column.len() != n {
                return Err(KpdError::invalid_input(format!(
                    "prior-distance column length mismatch for {kp:?}: got {}, expected n={n}",
                    column.len()
                )));
            }
            if let Some((idx, value)) = first_non_finite(column) {
                return Err(KpdError::invalid_input(format!(
                    "prior-distance column for {kp:?} must be finite: sample {idx} is {value}"
                )));
            }
        }

        Ok(Self {
            inclination,
            prior_distance,
        })
    }

    /// View with no prior-distance columns.
    pub fn without_priors(inclination: &'a [f64]) -> Result<Self, KpdError> {
        Self::new(inclination, [None, None, None])
    }

    /// Number of samples in the well.
    pub fn n(&self) -> usize {
        self.inclination.len()
    }

    /// Depth-ordered inclination measurements.
    pub fn inclination(&self) -> &'a [f64] {
        self.inclination
    }

    /// Prior-distance column for one class, when supplied.
    pub fn prior_distance(&self, class: Keypoint) -> Option<&'a [f64]> {
        self.prior_distance[class.slot()]
    }

    /// Derives the prior position hint for one class.
    ///
    /// Returns the first sample index minimizing the prior-distance column,
    /// accepted only when that minimum is below [`NO_PRIOR_SENTINEL`].
    /// Absence of a usable prior is not an error.
    pub fn prior_position(&self, class: Keypoint) -> Option<usize> {
        let column = self.prior_distance(class)?;
        let (idx, min) = column
            .iter()
            .copied()
            .enumerate()
            .reduce(|best, next| if next.1 < best.1 { next } else { best })?;
        (min < NO_PRIOR_SENTINEL).then_some(idx)
    }
}

/// Zero-copy row-major n x 4 class-probability matrix over
/// {no-event, build, hold, drop}.
#[derive(Clone, Copy, Debug)]
pub struct ProbMatrixView<'a> {
    values: &'a [f64],
    n: usize,
}

impl<'a> ProbMatrixView<'a> {
    /// Constructs a validated matrix view.
    pub fn new(values: &'a [f64], n: usize) -> Result<Self, KpdError> {
        if n == 0 {
            return Err(KpdError::invalid_input("n must be >= 1"));
        }
        let expected_len = n
            .checked_mul(CLASS_COUNT)
            .ok_or_else(|| KpdError::invalid_input("n*4 overflow while validating shape"))?;
        if values.len() != expected_len {
            return Err(KpdError::invalid_input(format!(
                "probability matrix length mismatch: got {}, expected {expected_len} (n={n})",
                values.len()
            )));
        }
        if let Some((idx, value)) = first_non_finite(values) {
            return Err(KpdError::invalid_input(format!(
                "probabilities must be finite: entry {idx} is {value}"
            )));
        }
        Ok(Self { values, n })
    }

    /// Number of samples (rows).
    pub fn n(&self) -> usize {
        self.n
    }

    /// Raw row-major backing slice.
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// One sample's probability row over the four classes.
    pub fn row(&self, sample: usize) -> &'a [f64] {
        let start = sample * CLASS_COUNT;
        &self.values[start..start + CLASS_COUNT]
    }

    /// Probability of one class at one sample.
    pub fn class_prob(&self, sample: usize, class: Keypoint) -> f64 {
        self.values[sample * CLASS_COUNT + class.class_column()]
    }
}

fn first_non_finite(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
}
