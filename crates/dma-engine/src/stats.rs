// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cumulative transfer statistics.
//!
//! [`TransferStats`] counts issued transfers, moved bytes, and waits per
//! direction. The scheduler snapshots these into its run report, and the
//! engine's invariants ("a weight reload is issued if and only if the
//! channel group changed") are asserted against them in tests.

use crate::Direction;

/// Cumulative counters for one transfer engine instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TransferStats {
    /// Transfers issued external → local (prefetch direction).
    pub issued_in: u64,
    /// Transfers issued local → external (writeback direction).
    pub issued_out: u64,
    /// Bytes moved external → local.
    pub bytes_in: u64,
    /// Bytes moved local → external.
    pub bytes_out: u64,
    /// Completed `wait` calls.
    pub waits: u64,
}

impl TransferStats {
    /// Records one issued transfer of `bytes` bytes.
    pub(crate) fn record_issue(&mut self, direction: Direction, bytes: usize) {
        match direction {
            Direction::ExtToLoc => {
                self.issued_in += 1;
                self.bytes_in += bytes as u64;
            }
            Direction::LocToExt => {
                self.issued_out += 1;
                self.bytes_out += bytes as u64;
            }
        }
    }

    /// Records one completed wait.
    pub(crate) fn record_wait(&mut self) {
        self.waits += 1;
    }

    /// Total transfers issued in both directions.
    pub fn total_issued(&self) -> u64 {
        self.issued_in + self.issued_out
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Transfers: {} in ({} B), {} out ({} B), {} waits",
            self.issued_in, self.bytes_in, self.issued_out, self.bytes_out, self.waits,
        )
    }
}
