// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Transfer descriptors: 2-level strided copies between memory tiers.
//!
//! A descriptor expresses `outer_count` repetitions of `inner_count`
//! contiguous runs of `elem_bytes`, with independent strides per tier.
//! This is exactly the geometry needed to translate between an external
//! tensor's position-interleaved packing and a local tile's
//! channel-planar packing: the interleaved side strides by the channel
//! count between elements while the planar side advances contiguously.

use crate::DmaError;

/// Direction of a transfer between the two memory tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    /// External tier → local tier (prefetch).
    ExtToLoc,
    /// Local tier → external tier (writeback).
    LocToExt,
}

/// Describes one 2-level strided copy.
///
/// Ephemeral: constructed per transfer from the tile geometry and the
/// layer parameters, consumed by [`crate::TransferEngine::issue`].
///
/// The copied byte ranges, per tier, are:
/// ```text
/// for o in 0..outer_count:
///     for i in 0..inner_count:
///         offset + o * outer_stride + i * inner_stride .. + elem_bytes
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransferDescriptor {
    /// Copy direction.
    pub direction: Direction,
    /// Byte offset of the first element in the external tier.
    pub ext_offset: usize,
    /// Byte offset of the first element in the local tier.
    pub loc_offset: usize,
    /// Length of one contiguous run, in bytes.
    pub elem_bytes: usize,
    /// Number of runs per outer step.
    pub inner_count: usize,
    /// External-tier byte stride between runs.
    pub ext_inner_stride: usize,
    /// Local-tier byte stride between runs.
    pub loc_inner_stride: usize,
    /// Number of outer steps.
    pub outer_count: usize,
    /// External-tier byte stride between outer steps.
    pub ext_outer_stride: usize,
    /// Local-tier byte stride between outer steps.
    pub loc_outer_stride: usize,
}

impl TransferDescriptor {
    /// A fully contiguous copy of `bytes` bytes.
    pub fn contiguous(
        direction: Direction,
        ext_offset: usize,
        loc_offset: usize,
        bytes: usize,
    ) -> Self {
        Self {
            direction,
            ext_offset,
            loc_offset,
            elem_bytes: bytes,
            inner_count: 1,
            ext_inner_stride: bytes,
            loc_inner_stride: bytes,
            outer_count: 1,
            ext_outer_stride: bytes,
            loc_outer_stride: bytes,
        }
    }

    /// Total bytes moved by this transfer.
    pub fn total_bytes(&self) -> usize {
        self.elem_bytes * self.inner_count * self.outer_count
    }

    /// Checks the descriptor for degenerate geometry.
    pub fn validate(&self) -> Result<(), DmaError> {
        if self.total_bytes() == 0 {
            return Err(DmaError::EmptyTransfer);
        }
        Ok(())
    }

    /// The exclusive end of the byte footprint in the external tier.
    pub fn ext_end(&self) -> usize {
        self.ext_offset + Self::span(
            self.elem_bytes,
            self.inner_count,
            self.ext_inner_stride,
            self.outer_count,
            self.ext_outer_stride,
        )
    }

    /// The exclusive end of the byte footprint in the local tier.
    pub fn loc_end(&self) -> usize {
        self.loc_offset + Self::span(
            self.elem_bytes,
            self.inner_count,
            self.loc_inner_stride,
            self.outer_count,
            self.loc_outer_stride,
        )
    }

    fn span(
        elem: usize,
        inner_count: usize,
        inner_stride: usize,
        outer_count: usize,
        outer_stride: usize,
    ) -> usize {
        if elem == 0 || inner_count == 0 || outer_count == 0 {
            return 0;
        }
        (outer_count - 1) * outer_stride + (inner_count - 1) * inner_stride + elem
    }
}
