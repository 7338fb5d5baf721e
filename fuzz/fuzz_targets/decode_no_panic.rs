// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use kpd_core::{CLASS_COUNT, ProbMatrixView, WellSeriesView};
use kpd_decode::{DecoderConfig, SequenceDecoder};
use libfuzzer_sys::fuzz_target;

struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn next_u8(&mut self) -> u8 {
        let value = self.data.get(self.offset).copied().unwrap_or(0);
        self.offset = self.offset.saturating_add(1);
        value
    }

    fn next_f64_in(&mut self, low: f64, high: f64) -> f64 {
        let raw = u16::from_le_bytes([self.next_u8(), self.next_u8()]);
        low + (high - low) * f64::from(raw) / f64::from(u16::MAX)
    }
}

fn bounded(seed: u8, low: usize, high: usize) -> usize {
    low + usize::from(seed) % (high - low + 1)
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = ByteCursor::new(data);

    let n = bounded(cursor.next_u8(), 1, 250);
    let mut inclination = Vec::with_capacity(n);
    for _ in 0..n {
        inclination.push(cursor.next_f64_in(-90.0, 90.0));
    }

    let mut probabilities = Vec::with_capacity(n * CLASS_COUNT);
    for _ in 0..n * CLASS_COUNT {
        probabilities.push(cursor.next_f64_in(0.0, 1.0));
    }

    let use_priors = cursor.next_u8() & 1 == 1;
    let prior_columns: [Option<Vec<f64>>; 3] = if use_priors {
        [0, 1, 2].map(|_| {
            let anchor = bounded(cursor.next_u8(), 0, n - 1);
            Some(
                (0..n)
                    .map(|row| (row as f64 - anchor as f64).abs())
                    .collect(),
            )
        })
    } else {
        [None, None, None]
    };

    let series = WellSeriesView::new(
        &inclination,
        [
            prior_columns[0].as_deref(),
            prior_columns[1].as_deref(),
            prior_columns[2].as_deref(),
        ],
    )
    .expect("mapped inclination must form a valid view");
    let probs =
        ProbMatrixView::new(&probabilities, n).expect("mapped probabilities must form a valid matrix");

    let decoder =
        SequenceDecoder::new(DecoderConfig::default()).expect("default config must be valid");
    let decoded = decoder
        .decode_well(&series, &probs)
        .expect("decoding in-contract input must not fail");

    for (_, position) in decoded.assignment.entries() {
        assert!(position < n, "decoded position {position} out of range {n}");
    }
    if !decoded.diagnostics.fallback_used {
        assert!(
            decoded
                .assignment
                .respects_spacing(decoder.config().min_gap),
            "non-fallback assignment violated spacing: {:?}",
            decoded.assignment
        );
    }
});
