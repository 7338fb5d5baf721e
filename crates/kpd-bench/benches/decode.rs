// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use kpd_core::{CLASS_COUNT, Keypoint, ProbMatrixView, WellSeriesView};
use kpd_decode::{CandidateConfig, DecoderConfig, SequenceDecoder, generate_candidates};

/// Build-hold-drop inclination profile with gentle measurement ripple.
fn favorable_well(n: usize) -> Vec<f64> {
    let build_at = n / 5;
    let hold_at = n * 2 / 5;
    let drop_at = n * 4 / 5;
    (0..n)
        .map(|i| {
            let ripple = (i as f64 * 0.7).sin() * 0.02;
            let base = if i < build_at {
                0.0
            } else if i < hold_at {
                (i - build_at) as f64 * 0.4
            } else if i < drop_at {
                (hold_at - build_at) as f64 * 0.4
            } else {
                (hold_at - build_at) as f64 * 0.4 - (i - drop_at) as f64 * 0.3
            };
            base + ripple
        })
        .collect()
}

fn spiked_probs(n: usize) -> Vec<f64> {
    let mut values = vec![0.02; n * CLASS_COUNT];
    values[(n / 5) * CLASS_COUNT + Keypoint::Build.class_column()] = 0.9;
    values[(n * 2 / 5) * CLASS_COUNT + Keypoint::Hold.class_column()] = 0.9;
    values[(n * 4 / 5) * CLASS_COUNT + Keypoint::Drop.class_column()] = 0.9;
    // A band of weaker spikes keeps all ten top-K slots occupied.
    for offset in 1..=12 {
        let row = (n / 5 + offset) % n;
        values[row * CLASS_COUNT + Keypoint::Build.class_column()] = 0.2;
        let row = (n * 2 / 5 + offset) % n;
        values[row * CLASS_COUNT + Keypoint::Hold.class_column()] = 0.2;
        let row = (n * 4 / 5 + offset) % n;
        values[row * CLASS_COUNT + Keypoint::Drop.class_column()] = 0.2;
    }
    values
}

fn bench_candidate_generation(c: &mut Criterion) {
    for n in [200_usize, 2_000] {
        let incl = favorable_well(n);
        let values = spiked_probs(n);
        let series = WellSeriesView::without_priors(&incl).expect("bench series should be valid");
        let probs = ProbMatrixView::new(&values, n).expect("bench probs should be valid");
        let config = CandidateConfig::default();

        c.bench_function(&format!("candidates/all-classes/n={n}"), |b| {
            b.iter(|| {
                for class in Keypoint::ALL {
                    let candidates =
                        generate_candidates(&series, &probs, class, Some(n / 2), &config)
                            .expect("bench generation should succeed");
                    black_box(candidates);
                }
            })
        });
    }
}

fn bench_decode_well(c: &mut Criterion) {
    for n in [200_usize, 2_000] {
        let incl = favorable_well(n);
        let values = spiked_probs(n);
        let series = WellSeriesView::without_priors(&incl).expect("bench series should be valid");
        let probs = ProbMatrixView::new(&values, n).expect("bench probs should be valid");
        let decoder =
            SequenceDecoder::new(DecoderConfig::default()).expect("bench config should be valid");

        c.bench_function(&format!("decode/full-well/n={n}"), |b| {
            b.iter(|| {
                let decoded = decoder
                    .decode_well(&series, &probs)
                    .expect("bench decode should succeed");
                black_box(decoded)
            })
        });
    }
}

criterion_group!(benches, bench_candidate_generation, bench_decode_well);
criterion_main!(benches);
