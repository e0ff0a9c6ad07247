// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-unit view of the cluster.

use std::sync::Barrier;

/// The unit elected for shared (non-per-tile) transfer issuance.
const LEADER_UNIT: usize = 0;

/// What one execution unit sees of the cluster it runs in.
///
/// Passed by reference into the SPMD body. The leader capability is an
/// explicit query so call sites read as "the unit responsible for shared
/// transfers" rather than a magic id comparison.
pub struct UnitCtx<'a> {
    id: usize,
    units: usize,
    barrier: &'a Barrier,
}

impl<'a> UnitCtx<'a> {
    pub(crate) fn new(id: usize, units: usize, barrier: &'a Barrier) -> Self {
        Self { id, units, barrier }
    }

    /// This unit's id, `0..units`.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of units in the cluster.
    pub fn units(&self) -> usize {
        self.units
    }

    /// Returns `true` on the unit elected to issue shared transfers.
    ///
    /// Exactly one unit of the cluster answers `true`.
    pub fn is_leader(&self) -> bool {
        self.id == LEADER_UNIT
    }

    /// Blocks until every unit of the cluster has arrived.
    ///
    /// Establishes a total order: writes performed by any unit before the
    /// barrier are visible to all units after it.
    pub fn barrier(&self) {
        self.barrier.wait();
    }
}

impl std::fmt::Debug for UnitCtx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitCtx")
            .field("id", &self.id)
            .field("units", &self.units)
            .field("leader", &self.is_leader())
            .finish()
    }
}
