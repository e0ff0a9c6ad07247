// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Kernel arguments and the shared output view.

use dma_engine::TransferHandle;

/// The caller's position in the SPMD cluster.
///
/// All units invoke the primitive with identical arguments except this;
/// the primitive uses it to partition the tile internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitInfo {
    /// This unit's id, `0..count`.
    pub id: usize,
    /// Number of units in the cluster.
    pub count: usize,
}

impl UnitInfo {
    /// A single-unit cluster (reference runs, tests).
    pub const SOLO: UnitInfo = UnitInfo { id: 0, count: 1 };

    /// The row range `[start, end)` this unit owns out of `rows`,
    /// chunked so the split is contiguous per unit.
    pub fn row_range(&self, rows: usize) -> (usize, usize) {
        let chunk = rows.div_ceil(self.count);
        let start = (self.id * chunk).min(rows);
        let end = ((self.id + 1) * chunk).min(rows);
        (start, end)
    }
}

/// A writable view into a shared local-memory region.
///
/// The only channel through which a primitive may write. Creation is the
/// unsafe step: the caller asserts the region is valid for the duration
/// of the kernel invocation and written only through this view. Writes
/// are bounds-checked; race freedom comes from the primitive's internal
/// partitioning (each unit writes a disjoint row range).
pub struct TileView {
    ptr: *mut u8,
    len: usize,
}

// Safety: the view is handed to every unit of the cluster; disjointness
// of the written ranges is the primitive's partitioning contract.
unsafe impl Send for TileView {}
unsafe impl Sync for TileView {}

impl TileView {
    /// Wraps a raw region.
    ///
    /// # Safety
    /// `ptr..ptr+len` must be valid for writes for the lifetime of the
    /// view, and no other code may access the region while the view is
    /// alive except through this view.
    pub unsafe fn new(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }

    /// View length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the view is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writes one byte at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn set(&self, index: usize, value: u8) {
        assert!(index < self.len, "tile view write at {index} of {}", self.len);
        // Safety: bounds checked; validity guaranteed by `new`'s contract.
        unsafe {
            self.ptr.add(index).write(value);
        }
    }
}

impl std::fmt::Debug for TileView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileView").field("len", &self.len).finish()
    }
}

/// The complete argument list of the compute-primitive contract.
///
/// Mirrors the generated-layer calling convention: buffers, true tile
/// extents, the four padding flags, stride, quantization parameters, the
/// per-channel vectors, and the scratch views some primitives need for
/// internal repacking. The reference depthwise primitive ignores the
/// scratch views and the optional bias-add pointer, but the engine
/// always supplies them.
pub struct KernelArgs<'a> {
    /// Input window, channel-planar: `channels` planes of `in_h * in_w`.
    pub input: &'a [u8],
    /// Input window extent in rows.
    pub in_h: usize,
    /// Input window extent in columns.
    pub in_w: usize,
    /// Input channel count of this tile.
    pub channels: usize,
    /// Weights, channel-planar: `out_channels` planes of
    /// `kernel_h * kernel_w` i8 values.
    pub weights: &'a [u8],
    /// Output channel count of this tile.
    pub out_channels: usize,
    /// Kernel height.
    pub kernel_h: usize,
    /// Kernel width.
    pub kernel_w: usize,
    /// Padding applied at the top edge of this tile.
    pub pad_top: bool,
    /// Padding applied at the bottom edge.
    pub pad_bottom: bool,
    /// Padding applied at the left edge.
    pub pad_left: bool,
    /// Padding applied at the right edge.
    pub pad_right: bool,
    /// Pad amount on flagged edges, in elements.
    pub pad: usize,
    /// Spatial stride.
    pub stride: usize,
    /// Optional per-channel additive bias (i8), for layers without
    /// folded batch norm.
    pub bias_add: Option<&'a [u8]>,
    /// Requantization right-shift.
    pub out_shift: u8,
    /// Requantization multiplier for the non-batch-norm path.
    pub out_mult: u16,
    /// Output tile view, channel-planar: `out_channels` planes of
    /// `out_h * out_w`.
    pub output: &'a TileView,
    /// Output tile extent in rows.
    pub out_h: usize,
    /// Output tile extent in columns.
    pub out_w: usize,
    /// Per-channel batch-norm scale vector (little-endian i32), empty
    /// for the non-batch-norm path.
    pub scale: &'a [u8],
    /// Per-channel batch-norm bias vector (little-endian i32).
    pub bias: &'a [u8],
    /// Im2col scratch view, if the primitive needs one.
    pub im2col: Option<&'a TileView>,
    /// Weight-repack scratch view, if the primitive needs one.
    pub repack: Option<&'a TileView>,
    /// Completion handle a primitive may use for its own internal
    /// asynchronous transfers. The reference primitive ignores it.
    pub dma_event: Option<TransferHandle>,
    /// This unit's position in the cluster.
    pub unit: UnitInfo,
}
