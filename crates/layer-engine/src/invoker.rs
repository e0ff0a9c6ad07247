// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The compute-kernel invoker: thin glue between the active buffers and
//! the opaque numeric primitive.
//!
//! All unsafe local-memory access of the engine is concentrated here.
//! The safety argument is the barrier discipline of the scheduler: the
//! kernel runs strictly between Barrier1 and Barrier2 of an iteration,
//! during which the active slots are written by nobody (prefetches
//! target the opposite slots) and the output slot is written only
//! through the primitive's internally partitioned view.

use crate::{DoubleBufferState, LayerParameters};
use conv_kernels::{ComputeKernel, KernelArgs, KernelError, TileView, UnitInfo};
use dma_engine::LocalMemory;
use tile_arena::{ArenaLayout, TensorRole};
use tile_planner::{TileDescriptor, TilePlan};

/// Runs the primitive on the currently active buffers for `tile`.
///
/// Invoked by every unit of the cluster with identical arguments except
/// the unit info; the primitive partitions the tile internally.
pub(crate) fn invoke(
    kernel: &dyn ComputeKernel,
    local: &LocalMemory,
    layout: &ArenaLayout,
    plan: &TilePlan,
    params: &LayerParameters,
    tile: &TileDescriptor,
    state: &DoubleBufferState,
    unit: UnitInfo,
) -> Result<(), KernelError> {
    let g = plan.geometry();

    let input_slot = layout.slot(TensorRole::Input, state.input().active());
    let weight_slot = layout.slot(TensorRole::Weight, state.coeff().active());
    let scale_slot = layout.slot(TensorRole::Scale, state.coeff().active());
    let bias_slot = layout.slot(TensorRole::Bias, state.coeff().active());
    let output_slot = layout.slot(TensorRole::Output, state.output().active());

    // Safety: between Barrier1 and Barrier2 no transfer targets the
    // active slots (prefetches fill the opposite slot of each pair) and
    // no other code writes them; the slices stay immutable for the whole
    // invocation.
    let (input, weights, scale, bias) = unsafe {
        (
            local.slice(input_slot.offset, tile.bytes.input),
            local.slice(weight_slot.offset, tile.bytes.weight),
            local.slice(scale_slot.offset, tile.bytes.scale),
            local.slice(bias_slot.offset, tile.bytes.bias),
        )
    };

    // Safety: the output slot is valid for the view's length, and during
    // compute it is written only through this view, with units writing
    // disjoint row ranges per the primitive's partitioning contract.
    let output = unsafe {
        TileView::new(
            local.base_ptr().add(output_slot.offset),
            tile.bytes.output,
        )
    };

    // Scratch views, if the layout carries them. The reference primitive
    // ignores scratch; hardware kernels repack through these.
    let im2col = layout.scratch("im2col").map(|s| {
        // Safety: the scratch region is exclusive to the kernel between
        // the same two barriers.
        unsafe { TileView::new(local.base_ptr().add(s.offset), s.size) }
    });
    let repack = layout
        .scratch("repack")
        .map(|s| unsafe { TileView::new(local.base_ptr().add(s.offset), s.size) });

    let args = KernelArgs {
        input,
        in_h: tile.in_h,
        in_w: tile.in_w,
        channels: tile.group_channels,
        weights,
        out_channels: tile.group_channels,
        kernel_h: g.kernel_h,
        kernel_w: g.kernel_w,
        pad_top: tile.padding.top,
        pad_bottom: tile.padding.bottom,
        pad_left: tile.padding.left,
        pad_right: tile.padding.right,
        pad: g.pad,
        stride: g.stride,
        bias_add: None,
        out_shift: params.out_shift,
        out_mult: params.out_mult,
        output: &output,
        out_h: tile.out_h,
        out_w: tile.out_w,
        scale,
        bias,
        im2col: im2col.as_ref(),
        repack: repack.as_ref(),
        dma_event: None,
        unit,
    };

    kernel.run(&args)
}
