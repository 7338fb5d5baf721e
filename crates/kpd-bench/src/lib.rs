// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Benchmark crate name helper.
pub fn crate_name() -> &'static str {
    let _ = (
        kpd_core::crate_name(),
        kpd_decode::crate_name(),
        kpd_pipeline::crate_name(),
    );
    "kpd-bench"
}
