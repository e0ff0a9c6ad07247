// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tile planning.

/// Errors that can occur while validating layer geometry or building a
/// tile plan.
///
/// All of these fire at layer-generation time; a constructed
/// [`crate::TilePlan`] is valid for the layer's lifetime.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// A geometry dimension is zero.
    #[error("geometry has a zero-sized {0}")]
    ZeroDimension(&'static str),

    /// The kernel does not fit the padded input.
    #[error("kernel {kernel_h}x{kernel_w} exceeds padded input {padded_h}x{padded_w}")]
    KernelTooLarge {
        kernel_h: usize,
        kernel_w: usize,
        padded_h: usize,
        padded_w: usize,
    },

    /// Padding must stay below the kernel extent or boundary tiles would
    /// consist purely of synthesized values.
    #[error("padding {pad} is too large for kernel {kernel_h}x{kernel_w}")]
    PadTooLarge {
        pad: usize,
        kernel_h: usize,
        kernel_w: usize,
    },

    /// A tile axis is larger than the tensor axis it cuts.
    #[error("tile size {tile} exceeds tensor extent {total} on the {axis} axis")]
    TileTooLarge {
        axis: &'static str,
        tile: usize,
        total: usize,
    },
}
