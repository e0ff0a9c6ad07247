// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Transfer geometry: mapping tiles to strided copies.
//!
//! External activations are position-interleaved (channel fastest), local
//! tiles are channel-planar, so spatial tensors move one channel plane
//! per descriptor: an inner run per element striding by the channel count
//! on the external side and packing contiguously on the local side.
//! Weights and the quantization vectors are channel-planar in both tiers
//! and move as single contiguous runs.
//!
//! Everything here is derived purely from the [`TileDescriptor`] and the
//! layer's base offsets; the DMA orchestrator never recomputes tensor
//! geometry.

use crate::{TileDescriptor, TilePlan};
use dma_engine::{Direction, TransferDescriptor};

/// Descriptors filling a local input slot with `tile`'s input window.
///
/// One gather per channel of the group: the external side walks the
/// interleaved tensor (element stride = channel count, row stride = full
/// row pitch), the local side packs the plane densely.
pub fn input_prefetch(
    plan: &TilePlan,
    tile: &TileDescriptor,
    ext_base: usize,
    loc_offset: usize,
) -> Vec<TransferDescriptor> {
    let g = plan.geometry();
    let channels = g.channels;
    let window_base =
        ext_base + (tile.in_row_start * g.in_w + tile.in_col_start) * channels + tile.channel_start;

    (0..tile.group_channels)
        .map(|c| TransferDescriptor {
            direction: Direction::ExtToLoc,
            ext_offset: window_base + c,
            loc_offset: loc_offset + c * tile.in_h * tile.in_w,
            elem_bytes: 1,
            inner_count: tile.in_w,
            ext_inner_stride: channels,
            loc_inner_stride: 1,
            outer_count: tile.in_h,
            ext_outer_stride: g.in_w * channels,
            loc_outer_stride: tile.in_w,
        })
        .collect()
}

/// Descriptor filling a local weight slot with `tile`'s channel group.
///
/// Weights are channel-planar in the external tier, so the whole group is
/// one contiguous run of `group_channels * kernel_h * kernel_w` bytes.
pub fn weight_prefetch(
    plan: &TilePlan,
    tile: &TileDescriptor,
    ext_base: usize,
    loc_offset: usize,
) -> TransferDescriptor {
    let g = plan.geometry();
    let per_channel = g.kernel_h * g.kernel_w;
    TransferDescriptor::contiguous(
        Direction::ExtToLoc,
        ext_base + tile.channel_start * per_channel,
        loc_offset,
        tile.group_channels * per_channel,
    )
}

/// Descriptor staging one quantization vector (scale or bias) for
/// `tile`'s channel group: `group_channels` little-endian `i32`s.
pub fn coeff_prefetch(
    tile: &TileDescriptor,
    ext_base: usize,
    loc_offset: usize,
) -> TransferDescriptor {
    TransferDescriptor::contiguous(
        Direction::ExtToLoc,
        ext_base + tile.channel_start * 4,
        loc_offset,
        tile.group_channels * 4,
    )
}

/// Descriptors scattering a completed local output tile back to its
/// external destination, inverting the input gather: planar local →
/// interleaved external.
pub fn output_writeback(
    plan: &TilePlan,
    tile: &TileDescriptor,
    ext_base: usize,
    loc_offset: usize,
) -> Vec<TransferDescriptor> {
    let g = plan.geometry();
    let channels = g.channels;
    let out_w_total = g.out_w();
    let window_base = ext_base
        + (tile.out_row_start * out_w_total + tile.out_col_start) * channels
        + tile.channel_start;

    (0..tile.group_channels)
        .map(|c| TransferDescriptor {
            direction: Direction::LocToExt,
            ext_offset: window_base + c,
            loc_offset: loc_offset + c * tile.out_h * tile.out_w,
            elem_bytes: 1,
            inner_count: tile.out_w,
            ext_inner_stride: channels,
            loc_inner_stride: 1,
            outer_count: tile.out_h,
            ext_outer_stride: out_w_total * channels,
            loc_outer_stride: tile.out_w,
        })
        .collect()
}
