// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer parameters: where the tensors live and how outputs requantize.

use tile_planner::ConvGeometry;

/// Byte offsets of the layer's tensors inside the external tier.
///
/// The generated layer receives these from the network-level loader; the
/// host harness computes a dense placement with
/// [`ExternalPlacement::contiguous`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExternalPlacement {
    /// Input activation tensor (position-interleaved).
    pub input: usize,
    /// Weight tensor (channel-planar).
    pub weights: usize,
    /// Per-channel scale vector (little-endian i32).
    pub scale: usize,
    /// Per-channel bias vector (little-endian i32).
    pub bias: usize,
    /// Output activation tensor (position-interleaved).
    pub output: usize,
    /// Exclusive end of the placement.
    pub total_bytes: usize,
}

impl ExternalPlacement {
    /// Packs the layer's tensors back to back, 4-byte aligned, starting
    /// at offset 0.
    pub fn contiguous(geometry: &ConvGeometry) -> Self {
        let align = |n: usize| (n + 3) & !3;
        let input = 0;
        let weights = align(input + geometry.input_bytes());
        let scale = align(weights + geometry.weight_bytes());
        let bias = align(scale + geometry.coeff_bytes());
        let output = align(bias + geometry.coeff_bytes());
        let total_bytes = align(output + geometry.output_bytes());
        Self {
            input,
            weights,
            scale,
            bias,
            output,
            total_bytes,
        }
    }
}

/// Everything the engine needs to know about one layer invocation beyond
/// the tile plan itself. Supplied once, read-only for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LayerParameters {
    /// Tensor placement in the external tier.
    pub placement: ExternalPlacement,
    /// Requantization right-shift.
    pub out_shift: u8,
    /// Requantization multiplier for the non-batch-norm path.
    pub out_mult: u16,
}
