// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use kpd_core::{Keypoint, KpdError, ProbMatrixView, WellSeriesView};

const DEFAULT_TOP_K: usize = 10;
const DEFAULT_MIN_CONFIDENCE: f64 = 0.1;
const DEFAULT_TREND_WINDOW: usize = 10;
const DEFAULT_TREND_BONUS: f64 = 0.3;
const DEFAULT_BUILD_TREND_MIN: f64 = 0.5;
const DEFAULT_DROP_TREND_MAX: f64 = -0.3;
const DEFAULT_HOLD_STD_MAX: f64 = 0.2;
const DEFAULT_PRIOR_RADIUS: usize = 15;
const DEFAULT_PRIOR_BONUS: f64 = 0.2;

/// Configuration for candidate extraction and scoring.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateConfig {
    /// Positions retained per class, ranked by raw class probability.
    pub top_k: usize,
    /// Raw probabilities at or below this floor are discarded.
    pub min_confidence: f64,
    /// Forward/centered window length for the trend criteria, in samples.
    pub trend_window: usize,
    /// Score added when a class's trend criterion holds.
    pub trend_bonus: f64,
    /// Build criterion: forward mean inclination gain must exceed this.
    pub build_trend_min: f64,
    /// Drop criterion: forward mean inclination gain must fall below this.
    pub drop_trend_max: f64,
    /// Hold criterion: first-difference std-dev must stay below this.
    pub hold_std_max: f64,
    /// Prior bonus applies within this distance of the prior position.
    pub prior_radius: usize,
    /// Maximum prior bonus, tapering linearly to zero at `prior_radius`.
    pub prior_bonus: f64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            trend_window: DEFAULT_TREND_WINDOW,
            trend_bonus: DEFAULT_TREND_BONUS,
            build_trend_min: DEFAULT_BUILD_TREND_MIN,
            drop_trend_max: DEFAULT_DROP_TREND_MAX,
            hold_std_max: DEFAULT_HOLD_STD_MAX,
            prior_radius: DEFAULT_PRIOR_RADIUS,
            prior_bonus: DEFAULT_PRIOR_BONUS,
        }
    }
}

impl CandidateConfig {
    pub(crate) fn validate(&self) -> Result<(), KpdError> {
        if self.top_k == 0 {
            return Err(KpdError::invalid_input(
                "CandidateConfig.top_k must be >= 1; got 0",
            ));
        }
        if self.trend_window == 0 {
            return Err(KpdError::invalid_input(
                "CandidateConfig.trend_window must be >= 1; got 0",
            ));
        }
        if self.prior_radius == 0 {
            return Err(KpdError::invalid_input(
                "CandidateConfig.prior_radius must be >= 1; got 0",
            ));
        }
        if !self.min_confidence.is_finite() || self.min_confidence < 0.0 {
            return Err(KpdError::invalid_input(format!(
                "CandidateConfig.min_confidence must be finite and >= 0.0; got {}",
                self.min_confidence
            )));
        }
        for (name, value) in [
            ("trend_bonus", self.trend_bonus),
            ("prior_bonus", self.prior_bonus),
            ("hold_std_max", self.hold_std_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(KpdError::invalid_input(format!(
                    "CandidateConfig.{name} must be finite and >= 0.0; got {value}"
                )));
            }
        }
        for (name, value) in [
            ("build_trend_min", self.build_trend_min),
            ("drop_trend_max", self.drop_trend_max),
        ] {
            if !value.is_finite() {
                return Err(KpdError::invalid_input(format!(
                    "CandidateConfig.{name} must be finite; got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// A scored position proposal for one class within one well.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub position: usize,
    /// Fused model confidence plus trend and prior bonuses.
    pub score: f64,
}

/// Per-class candidate lists for one well, each sorted by descending score.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassCandidates {
    pub build: Vec<Candidate>,
    pub hold: Vec<Candidate>,
    pub drop: Vec<Candidate>,
}

impl ClassCandidates {
    /// Candidate list for one class.
    pub fn for_class(&self, class: Keypoint) -> &[Candidate] {
        match class {
            Keypoint::Build => &self.build,
            Keypoint::Hold => &self.hold,
            Keypoint::Drop => &self.drop,
        }
    }

    pub(crate) fn for_class_mut(&mut self, class: Keypoint) -> &mut Vec<Candidate> {
        match class {
            Keypoint::Build => &mut self.build,
            Keypoint::Hold => &mut self.hold,
            Keypoint::Drop => &mut self.drop,
        }
    }

    /// Candidates generated per class, in physical class order.
    pub fn counts(&self) -> [usize; 3] {
        [self.build.len(), self.hold.len(), self.drop.len()]
    }
}

/// Candidate extraction with trend and prior scoring.
#[derive(Clone, Debug)]
pub struct CandidateGenerator {
    config: CandidateConfig,
}

impl CandidateGenerator {
    pub fn new(config: CandidateConfig) -> Result<Self, KpdError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CandidateConfig {
        &self.config
    }

    /// Generates the candidate list for one class of one well.
    ///
    /// `prior` is the optional design-derived prior position for the class;
    /// see [`WellSeriesView::prior_position`].
    pub fn generate(
        &self,
        series: &WellSeriesView<'_>,
        probs: &ProbMatrixView<'_>,
        class: Keypoint,
        prior: Option<usize>,
    ) -> Result<Vec<Candidate>, KpdError> {
        generate_candidates(series, probs, class, prior, &self.config)
    }

    /// Generates all three candidate lists, deriving priors from the view's
    /// prior-distance columns.
    pub fn generate_all(
        &self,
        series: &WellSeriesView<'_>,
        probs: &ProbMatrixView<'_>,
    ) -> Result<ClassCandidates, KpdError> {
        let mut out = ClassCandidates::default();
        for class in Keypoint::ALL {
            let prior = series.prior_position(class);
            *out.for_class_mut(class) = self.generate(series, probs, class, prior)?;
        }
        Ok(out)
    }
}

/// Free-function form of [`CandidateGenerator::generate`].
///
/// Ranks positions by raw class probability, keeps the top K above the
/// confidence floor, then augments each with the class's trend bonus and the
/// prior-proximity bonus. The result is sorted by total score descending,
/// ties broken by smaller position.
pub fn generate_candidates(
    series: &WellSeriesView<'_>,
    probs: &ProbMatrixView<'_>,
    class: Keypoint,
    prior: Option<usize>,
    config: &CandidateConfig,
) -> Result<Vec<Candidate>, KpdError> {
    config.validate()?;
    let n = series.n();
    if probs.n() != n {
        return Err(KpdError::invalid_input(format!(
            "probability matrix rows mismatch well length: got {}, expected {n}",
            probs.n()
        )));
    }

    let mut ranked: Vec<usize> = (0..n).collect();
    ranked.sort_by(|&left, &right| {
        probs
            .class_prob(right, class)
            .total_cmp(&probs.class_prob(left, class))
            .then_with(|| left.cmp(&right))
    });
    ranked.truncate(config.top_k);

    // Hold is the only class scored on the first-difference series.
    let diff = (class == Keypoint::Hold).then(|| first_difference(series.inclination()));

    let mut candidates = Vec::with_capacity(ranked.len());
    for position in ranked {
        let confidence = probs.class_prob(position, class);
        if confidence <= config.min_confidence {
            continue;
        }

        let mut score = confidence;
        if trend_holds(series.inclination(), diff.as_deref(), position, class, config) {
            score += config.trend_bonus;
        }
        if let Some(prior) = prior {
            score += prior_bonus(position, prior, config);
        }
        candidates.push(Candidate { position, score });
    }

    candidates.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| left.position.cmp(&right.position))
    });
    Ok(candidates)
}

/// First difference of the inclination series with a zero leading element,
/// so `diff[i] = incl[i] - incl[i-1]` and `diff.len() == incl.len()`.
fn first_difference(inclination: &[f64]) -> Vec<f64> {
    let mut diff = Vec::with_capacity(inclination.len());
    diff.push(0.0);
    diff.extend(
        inclination
            .windows(2)
            .map(|pair| pair[1] - pair[0]),
    );
    diff
}

fn trend_holds(
    inclination: &[f64],
    diff: Option<&[f64]>,
    position: usize,
    class: Keypoint,
    config: &CandidateConfig,
) -> bool {
    match class {
        Keypoint::Build => forward_trend(inclination, position, config.trend_window)
            .is_some_and(|gain| gain > config.build_trend_min),
        Keypoint::Drop => forward_trend(inclination, position, config.trend_window)
            .is_some_and(|gain| gain < config.drop_trend_max),
        Keypoint::Hold => diff
            .and_then(|diff| centered_std(diff, position, config.trend_window))
            .is_some_and(|std| std < config.hold_std_max),
    }
}

/// Mean of the `window` samples following `position`, minus the value at
/// `position`. `None` near the end of the well (insufficient window).
fn forward_trend(inclination: &[f64], position: usize, window: usize) -> Option<f64> {
    let end = position.checked_add(window)?;
    if end >= inclination.len() {
        return None;
    }
    let sum: f64 = inclination[position + 1..=end].iter().sum();
    Some(sum / window as f64 - inclination[position])
}

/// Population std-dev of the centered window `[position-window,
/// position+window)`. `None` near either boundary.
fn centered_std(diff: &[f64], position: usize, window: usize) -> Option<f64> {
    if position < window || position + window > diff.len() {
        return None;
    }
    let slice = &diff[position - window..position + window];
    let len = slice.len() as f64;
    let mean = slice.iter().sum::<f64>() / len;
    let variance = slice
        .iter()
        .map(|value| {
            let dev = value - mean;
            dev * dev
        })
        .sum::<f64>()
        / len;
    Some(variance.sqrt())
}

fn prior_bonus(position: usize, prior: usize, config: &CandidateConfig) -> f64 {
    let distance = position.abs_diff(prior);
    if distance < config.prior_radius {
        config.prior_bonus * (1.0 - distance as f64 / config.prior_radius as f64)
    } else {
        0.0
    }
}
