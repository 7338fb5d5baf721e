// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use kpd_core::{
    CLASS_COUNT, DecodeDiagnostics, DecodedWell, Keypoint, KeypointAssignment, KpdError, NO_EVENT,
    ProbMatrixView, WellSeriesView,
};
use kpd_decode::{DecoderConfig, SequenceDecoder};
use std::collections::HashMap;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One upstream model's per-sample class-probability matrix.
#[derive(Clone, Copy, Debug)]
pub struct ProbabilitySource<'a> {
    pub name: &'a str,
    pub matrix: ProbMatrixView<'a>,
}

/// Blend weight for one probability source.
#[derive(Clone, Copy, Debug)]
pub struct SourceWeight<'a> {
    pub name: &'a str,
    pub weight: f64,
}

/// Blends probability sources into one n x 4 matrix.
///
/// `fused = sum(weight[source] * matrix[source])` elementwise. Weights need
/// not sum to one and no renormalization is performed. The weight-name set
/// and the source-name set must match exactly.
pub fn fuse_sources(
    sources: &[ProbabilitySource<'_>],
    weights: &[SourceWeight<'_>],
    n: usize,
) -> Result<Vec<f64>, KpdError> {
    if weights.is_empty() {
        return Err(KpdError::invalid_input(
            "at least one fusion weight is required",
        ));
    }
    for (index, weight) in weights.iter().enumerate() {
        if !weight.weight.is_finite() {
            return Err(KpdError::invalid_input(format!(
                "fusion weights must be finite; weights[{index}] ('{}') is {}",
                weight.name, weight.weight
            )));
        }
        if weights[..index].iter().any(|prev| prev.name == weight.name) {
            return Err(KpdError::invalid_input(format!(
                "duplicate fusion weight name '{}'",
                weight.name
            )));
        }
    }
    for (index, source) in sources.iter().enumerate() {
        if sources[..index].iter().any(|prev| prev.name == source.name) {
            return Err(KpdError::invalid_input(format!(
                "duplicate probability source name '{}'",
                source.name
            )));
        }
        if source.matrix.n() != n {
            return Err(KpdError::invalid_input(format!(
                "probability source '{}' has {} rows, expected {n}",
                source.name,
                source.matrix.n()
            )));
        }
        if !weights.iter().any(|weight| weight.name == source.name) {
            return Err(KpdError::missing_source(format!(
                "probability source '{}' has no fusion weight",
                source.name
            )));
        }
    }

    let mut fused = vec![0.0; n * CLASS_COUNT];
    for weight in weights {
        let source = sources
            .iter()
            .find(|source| source.name == weight.name)
            .ok_or_else(|| {
                KpdError::missing_source(format!(
                    "fusion weight '{}' references no probability source",
                    weight.name
                ))
            })?;
        for (fused_value, &value) in fused.iter_mut().zip(source.matrix.values()) {
            *fused_value += weight.weight * value;
        }
    }
    Ok(fused)
}

/// Columnar view of the global sample table across all wells.
///
/// Rows are upstream order; each well's rows carry its sequence-local
/// 0-based positions, which must be exactly `0, 1, 2, ...` in encounter
/// order (depth order). Wells need not be contiguous in the table.
#[derive(Clone, Copy, Debug)]
pub struct SampleBatch<'a> {
    well_ids: &'a [u64],
    positions: &'a [u32],
    inclination: &'a [f64],
    prior_distance: [Option<&'a [f64]>; 3],
}

impl<'a> SampleBatch<'a> {
    /// Constructs a validated batch over borrowed columns.
    pub fn new(
        well_ids: &'a [u64],
        positions: &'a [u32],
        inclination: &'a [f64],
        prior_distance: [Option<&'a [f64]>; 3],
    ) -> Result<Self, KpdError> {
        let n = well_ids.len();
        if n == 0 {
            return Err(KpdError::invalid_input("batch must contain >= 1 sample"));
        }
        if positions.len() != n || inclination.len() != n {
            return Err(KpdError::invalid_input(format!(
                "column length mismatch: well_ids={n}, positions={}, inclination={}",
                positions.len(),
                inclination.len()
            )));
        }
        for class in Keypoint::ALL {
            if let Some(column) = prior_distance[class.slot()]
                && column.len() != n
            {
                return Err(KpdError::invalid_input(format!(
                    "prior-distance column length mismatch for {class:?}: got {}, expected {n}",
                    column.len()
                )));
            }
        }
        Ok(Self {
            well_ids,
            positions,
            inclination,
            prior_distance,
        })
    }

    /// Batch without prior-distance columns.
    pub fn without_priors(
        well_ids: &'a [u64],
        positions: &'a [u32],
        inclination: &'a [f64],
    ) -> Result<Self, KpdError> {
        Self::new(well_ids, positions, inclination, [None, None, None])
    }

    /// Number of samples (rows) in the batch.
    pub fn n(&self) -> usize {
        self.well_ids.len()
    }

    /// Groups rows by well id, preserving each well's encounter order and
    /// the first-appearance order of wells.
    ///
    /// Rejects the batch with [`KpdError::MalformedSequence`] when a well's
    /// positions are not exactly `0, 1, 2, ...` in encounter order
    /// (duplicates, gaps, or out-of-order depth samples).
    pub fn group_wells(&self) -> Result<Vec<WellGroup>, KpdError> {
        let mut groups: Vec<WellGroup> = Vec::new();
        let mut slots: HashMap<u64, usize> = HashMap::new();

        for (row, (&well_id, &position)) in
            self.well_ids.iter().zip(self.positions).enumerate()
        {
            let slot = *slots.entry(well_id).or_insert_with(|| {
                groups.push(WellGroup {
                    well_id,
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            let expected = u32::try_from(group.rows.len()).map_err(|_| {
                KpdError::invalid_input(format!("well {well_id} exceeds u32 sample positions"))
            })?;
            if position != expected {
                return Err(KpdError::malformed_sequence(format!(
                    "well {well_id}: expected position {expected} at row {row}, got {position}"
                )));
            }
            group.rows.push(row);
        }

        Ok(groups)
    }

    fn gathered_series(&self, group: &WellGroup) -> GatheredWell {
        let inclination: Vec<f64> = group
            .rows
            .iter()
            .map(|&row| self.inclination[row])
            .collect();
        let prior_distance = Keypoint::ALL.map(|class| {
            self.prior_distance[class.slot()]
                .map(|column| group.rows.iter().map(|&row| column[row]).collect())
        });
        GatheredWell {
            inclination,
            prior_distance,
        }
    }
}

/// One well's global row indices, in depth order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellGroup {
    pub well_id: u64,
    pub rows: Vec<usize>,
}

/// Owned per-well columns gathered from a (possibly non-contiguous) batch.
struct GatheredWell {
    inclination: Vec<f64>,
    prior_distance: [Option<Vec<f64>>; 3],
}

/// Per-well decode summary inside a [`BatchOutcome`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellReport {
    pub well_id: u64,
    pub assignment: KeypointAssignment,
    pub diagnostics: DecodeDiagnostics,
}

/// Output of one batch post-processing run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    /// One label per input row, aligned to input order.
    pub labels: Vec<u8>,
    pub wells_processed: usize,
    /// Wells whose assignment came from the decoder's fallback path.
    pub fallback_wells: usize,
    /// Final label counts over {no-event, build, hold, drop}.
    pub label_histogram: [usize; CLASS_COUNT],
    pub well_reports: Vec<WellReport>,
}

/// Fuses probability sources and decodes every well of a batch into a
/// global label vector.
#[derive(Clone, Debug)]
pub struct BatchPostProcessor {
    decoder: SequenceDecoder,
}

impl BatchPostProcessor {
    pub fn new(config: DecoderConfig) -> Result<Self, KpdError> {
        Ok(Self {
            decoder: SequenceDecoder::new(config)?,
        })
    }

    pub fn decoder(&self) -> &SequenceDecoder {
        &self.decoder
    }

    /// Runs fusion, grouping, and per-well decoding.
    ///
    /// Every distinct well id is processed exactly once; the output vector
    /// has one label per input row and nonzero labels only at decoded
    /// keypoint rows. Wells are independent, so the `rayon` feature decodes
    /// them in parallel with identical output.
    pub fn process(
        &self,
        batch: &SampleBatch<'_>,
        sources: &[ProbabilitySource<'_>],
        weights: &[SourceWeight<'_>],
    ) -> Result<BatchOutcome, KpdError> {
        let fused = fuse_sources(sources, weights, batch.n())?;
        let groups = batch.group_wells()?;

        #[cfg(feature = "rayon")]
        let decoded: Vec<DecodedWell> = groups
            .par_iter()
            .map(|group| self.decode_group(batch, &fused, group))
            .collect::<Result<_, KpdError>>()?;
        #[cfg(not(feature = "rayon"))]
        let decoded: Vec<DecodedWell> = groups
            .iter()
            .map(|group| self.decode_group(batch, &fused, group))
            .collect::<Result<_, KpdError>>()?;

        let mut labels = vec![NO_EVENT; batch.n()];
        let mut fallback_wells = 0;
        let mut well_reports = Vec::with_capacity(groups.len());
        for (group, well) in groups.iter().zip(decoded) {
            for (class, position) in well.assignment.entries() {
                labels[group.rows[position]] = class.label();
            }
            if well.diagnostics.fallback_used {
                fallback_wells += 1;
            }
            well_reports.push(WellReport {
                well_id: group.well_id,
                assignment: well.assignment,
                diagnostics: well.diagnostics,
            });
        }

        let mut label_histogram = [0; CLASS_COUNT];
        for &label in &labels {
            label_histogram[usize::from(label)] += 1;
        }

        Ok(BatchOutcome {
            labels,
            wells_processed: groups.len(),
            fallback_wells,
            label_histogram,
            well_reports,
        })
    }

    fn decode_group(
        &self,
        batch: &SampleBatch<'_>,
        fused: &[f64],
        group: &WellGroup,
    ) -> Result<DecodedWell, KpdError> {
        let gathered = batch.gathered_series(group);
        let prob_rows: Vec<f64> = group
            .rows
            .iter()
            .flat_map(|&row| fused[row * CLASS_COUNT..(row + 1) * CLASS_COUNT].iter().copied())
            .collect();

        let series = WellSeriesView::new(
            &gathered.inclination,
            [
                gathered.prior_distance[0].as_deref(),
                gathered.prior_distance[1].as_deref(),
                gathered.prior_distance[2].as_deref(),
            ],
        )?;
        let probs = ProbMatrixView::new(&prob_rows, group.rows.len())?;
        self.decoder.decode_well(&series, &probs)
    }
}

/// Pipeline crate name helper.
pub fn crate_name() -> &'static str {
    let _ = (kpd_core::crate_name(), kpd_decode::crate_name());
    "kpd-pipeline"
}

#[cfg(test)]
mod tests {
    use super::{
        BatchPostProcessor, ProbabilitySource, SampleBatch, SourceWeight, fuse_sources,
    };
    use kpd_core::{KpdError, ProbMatrixView};
    use kpd_decode::DecoderConfig;

    fn source<'a>(name: &'a str, values: &'a [f64], n: usize) -> ProbabilitySource<'a> {
        ProbabilitySource {
            name,
            matrix: ProbMatrixView::new(values, n).expect("test matrix should be valid"),
        }
    }

    #[test]
    fn fuse_weights_sources_without_renormalization() {
        let a = vec![0.1, 0.2, 0.3, 0.4];
        let b = vec![0.4, 0.3, 0.2, 0.1];
        let sources = [source("lgb", &a, 1), source("cat", &b, 1)];
        let weights = [
            SourceWeight {
                name: "lgb",
                weight: 0.7,
            },
            SourceWeight {
                name: "cat",
                weight: 0.25,
            },
        ];

        let fused = fuse_sources(&sources, &weights, 1).expect("fusion should succeed");
        let expected = [
            0.7 * 0.1 + 0.25 * 0.4,
            0.7 * 0.2 + 0.25 * 0.3,
            0.7 * 0.3 + 0.25 * 0.2,
            0.7 * 0.4 + 0.25 * 0.1,
        ];
        for (got, want) in fused.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn fuse_rejects_weight_without_source_and_source_without_weight() {
        let a = vec![0.25; 4];
        let sources = [source("lgb", &a, 1)];

        let orphan_weight = [
            SourceWeight {
                name: "lgb",
                weight: 0.7,
            },
            SourceWeight {
                name: "xgb",
                weight: 0.3,
            },
        ];
        let err = fuse_sources(&sources, &orphan_weight, 1).expect_err("orphan weight must fail");
        assert!(matches!(err, KpdError::MissingSource(_)));

        let orphan_source = [SourceWeight {
            name: "other",
            weight: 1.0,
        }];
        let err = fuse_sources(&sources, &orphan_source, 1).expect_err("orphan source must fail");
        assert!(matches!(err, KpdError::MissingSource(_)));
    }

    #[test]
    fn fuse_rejects_empty_weights_duplicates_and_shape_mismatch() {
        let a = vec![0.25; 4];
        let sources = [source("lgb", &a, 1)];

        let err = fuse_sources(&sources, &[], 1).expect_err("empty weights must fail");
        assert!(err.to_string().contains("at least one"));

        let duplicated = [
            SourceWeight {
                name: "lgb",
                weight: 0.5,
            },
            SourceWeight {
                name: "lgb",
                weight: 0.5,
            },
        ];
        let err = fuse_sources(&sources, &duplicated, 1).expect_err("duplicate weight must fail");
        assert!(err.to_string().contains("duplicate"));

        let weights = [SourceWeight {
            name: "lgb",
            weight: 1.0,
        }];
        let err = fuse_sources(&sources, &weights, 2).expect_err("row mismatch must fail");
        assert!(err.to_string().contains("rows"));
    }

    #[test]
    fn batch_validates_column_lengths() {
        let wells = [1_u64, 1];
        let positions = [0_u32, 1];
        let incl = [0.0];
        let err = SampleBatch::without_priors(&wells, &positions, &incl)
            .expect_err("short inclination must fail");
        assert!(err.to_string().contains("length mismatch"));

        let err = SampleBatch::without_priors(&[], &[], &[]).expect_err("empty batch must fail");
        assert!(err.to_string().contains(">= 1"));
    }

    #[test]
    fn grouping_preserves_first_appearance_order_and_rows() {
        // Two wells interleaved: grouping must keep encounter order.
        let wells = [7_u64, 9, 7, 9, 9];
        let positions = [0_u32, 0, 1, 1, 2];
        let incl = [0.0; 5];
        let batch = SampleBatch::without_priors(&wells, &positions, &incl)
            .expect("batch should be valid");

        let groups = batch.group_wells().expect("grouping should succeed");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].well_id, 7);
        assert_eq!(groups[0].rows, vec![0, 2]);
        assert_eq!(groups[1].well_id, 9);
        assert_eq!(groups[1].rows, vec![1, 3, 4]);
    }

    #[test]
    fn grouping_rejects_out_of_order_duplicate_and_gapped_positions() {
        let incl = [0.0; 2];

        let swapped = SampleBatch::without_priors(&[1, 1], &[1, 0], &incl)
            .expect("batch should be valid");
        let err = swapped
            .group_wells()
            .expect_err("out-of-order positions must fail");
        assert!(matches!(err, KpdError::MalformedSequence(_)));

        let duplicated = SampleBatch::without_priors(&[1, 1], &[0, 0], &incl)
            .expect("batch should be valid");
        assert!(duplicated.group_wells().is_err());

        let gapped = SampleBatch::without_priors(&[1, 1], &[0, 2], &incl)
            .expect("batch should be valid");
        assert!(gapped.group_wells().is_err());
    }

    #[test]
    fn processor_rejects_invalid_decoder_config() {
        let err = BatchPostProcessor::new(DecoderConfig {
            search_width: 0,
            ..DecoderConfig::default()
        })
        .expect_err("invalid config must fail");
        assert!(err.to_string().contains("search_width"));
    }
}
