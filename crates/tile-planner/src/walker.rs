// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Walking the loop nest in its fixed order.
//!
//! The order is part of the engine's contract: the input-channel
//! revolution turns innermost, then the column tile, then the row tile,
//! then the output-channel group. Weights for a channel group are thereby
//! reused across all spatial tiles of the group before being replaced.

use crate::{TileIndices, TilePlan};

impl TilePlan {
    /// The position after `indices`, or `None` past the last tile.
    ///
    /// The scheduler keeps two positions: `load` (the tile being
    /// prefetched) runs one step ahead of `exec` (the tile being
    /// computed); on the final iteration there is no next tile and no
    /// prefetch is issued.
    pub fn advance(&self, indices: TileIndices) -> Option<TileIndices> {
        let mut next = indices;

        next.in_group += 1;
        if next.in_group < self.in_group_count() {
            return Some(next);
        }
        next.in_group = 0;

        next.col += 1;
        if next.col < self.w_count() {
            return Some(next);
        }
        next.col = 0;

        next.row += 1;
        if next.row < self.h_count() {
            return Some(next);
        }
        next.row = 0;

        next.group += 1;
        if next.group < self.group_count() {
            return Some(next);
        }
        None
    }

    /// Iterates the whole nest from the first tile.
    pub fn iter(&self) -> TileIter<'_> {
        TileIter {
            plan: self,
            next: Some(self.first_indices()),
        }
    }
}

/// Iterator over a plan's loop nest, in execution order.
#[derive(Debug)]
pub struct TileIter<'a> {
    plan: &'a TilePlan,
    next: Option<TileIndices>,
}

impl Iterator for TileIter<'_> {
    type Item = TileIndices;

    fn next(&mut self) -> Option<TileIndices> {
        let current = self.next?;
        self.next = self.plan.advance(current);
        Some(current)
    }
}
