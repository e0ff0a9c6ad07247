// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tile descriptors: what one loop iteration operates on.

/// A position in the fixed loop nest.
///
/// `in_group` is the innermost revolution. For depthwise layers it has a
/// single value per output tile and mirrors `group`; channel-reducing
/// layers give it a real extent via
/// [`TilePlan::with_input_groups`](crate::TilePlan::with_input_groups).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TileIndices {
    /// Output-channel-group index (outer loop).
    pub group: usize,
    /// Row-tile index.
    pub row: usize,
    /// Column-tile index.
    pub col: usize,
    /// Input-channel-group index (innermost revolution).
    pub in_group: usize,
}

impl TileIndices {
    /// The first position of the loop nest.
    pub const ZERO: TileIndices = TileIndices {
        group: 0,
        row: 0,
        col: 0,
        in_group: 0,
    };

    /// The weight/scale/bias reload condition.
    ///
    /// A new transfer for the coefficient roles is issued exactly when a
    /// channel-group index differs from the previously executed tile;
    /// tiles sharing both indices reuse the already-resident weights.
    pub fn reloads_coefficients(&self, prev: &TileIndices) -> bool {
        self.group != prev.group || self.in_group != prev.in_group
    }
}

/// Padding flags for the four spatial edges of a tile.
///
/// True only on boundary tiles: an edge flag is set if and only if the
/// tile is first (leading edge) or last (trailing edge) on that axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Padding {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Padding {
    /// Returns `true` if any edge is padded.
    pub fn any(&self) -> bool {
        self.top || self.bottom || self.left || self.right
    }
}

/// Byte size of one tile, per tensor role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileBytes {
    pub input: usize,
    pub weight: usize,
    pub scale: usize,
    pub bias: usize,
    pub output: usize,
}

/// Everything the orchestrator and kernel invoker need to know about one
/// tile.
///
/// Created fresh by [`TilePlan::describe`](crate::TilePlan::describe)
/// each iteration, immutable once computed, and consumed within the same
/// iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileDescriptor {
    /// Loop-nest position this tile belongs to.
    pub indices: TileIndices,
    /// Channels in this group (smaller for a remainder group).
    pub group_channels: usize,
    /// First channel of the group in the full tensor.
    pub channel_start: usize,
    /// Output extent of this tile in rows.
    pub out_h: usize,
    /// Output extent of this tile in columns.
    pub out_w: usize,
    /// First output row of this tile in the full tensor.
    pub out_row_start: usize,
    /// First output column of this tile in the full tensor.
    pub out_col_start: usize,
    /// Input window extent in rows (halo included, clipped at edges).
    pub in_h: usize,
    /// Input window extent in columns.
    pub in_w: usize,
    /// First input row of the window in the full tensor.
    pub in_row_start: usize,
    /// First input column of the window.
    pub in_col_start: usize,
    /// Which edges of this tile receive synthesized padding.
    pub padding: Padding,
    /// Byte sizes per tensor role.
    pub bytes: TileBytes,
}
