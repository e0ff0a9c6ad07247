// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run reports: what one layer execution actually did.
//!
//! Counters are kept at orchestrator-operation granularity (one input
//! prefetch, one weight reload, one scale/bias staging pair, one
//! writeback), independent of how many hardware descriptors each
//! operation fanned out into. The engine's transfer-scheduling
//! invariants are asserted against these in tests.

use std::time::Duration;

/// Summary of one completed layer run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    /// Loop iterations executed.
    pub iterations: usize,
    /// Execution units that ran the layer.
    pub units: usize,
    /// Input-tile prefetch operations, including the pre-loop fill.
    pub input_prefetches: usize,
    /// Weight-tile transfers, including the pre-loop fill. Issued only
    /// when the channel group changed.
    pub weight_reloads: usize,
    /// Scale/bias staging pairs, including the pre-loop staging. Always
    /// equals `weight_reloads`: the coefficient roles reload together.
    pub coeff_stagings: usize,
    /// Output-tile writeback operations.
    pub writebacks: usize,
    /// Bytes of each writeback, in issue order.
    pub writeback_bytes: Vec<usize>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Total bytes written back to the external tier.
    pub fn total_output_bytes(&self) -> usize {
        self.writeback_bytes.iter().sum()
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Run: {} iterations on {} units in {:.2?} — {} input prefetches, \
             {} weight reloads, {} coeff stagings, {} writebacks ({} B out)",
            self.iterations,
            self.units,
            self.elapsed,
            self.input_prefetches,
            self.weight_reloads,
            self.coeff_stagings,
            self.writebacks,
            self.total_output_bytes(),
        )
    }
}
