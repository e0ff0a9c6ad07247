// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # conv-kernels
//!
//! The numeric compute primitive at the centre of the tiled layer engine,
//! specified as an opaque contract: given the active local buffers, a
//! tile's true extents, and its padding flags, write exactly the output
//! tile and read at most the declared input window.
//!
//! # Key Components
//!
//! - [`ComputeKernel`] — the contract. The engine treats the primitive as
//!   taking bounded time with no side effects beyond the output view; a
//!   primitive failure is fatal for the layer.
//! - [`KernelArgs`] — the full argument list: input window + extents,
//!   weights, padding flags, stride, quantization parameters, per-channel
//!   scale/bias vectors, scratch views, and the unit info the primitive
//!   uses to partition work across the cluster internally.
//! - [`DepthwiseConv`] — the portable reference primitive: i8 depthwise
//!   convolution with per-channel batch-norm requantization and ReLU,
//!   output rows split across execution units.
//! - [`TileView`] — a bounds-checked writable view into shared local
//!   memory, the only thing a kernel may write through.
//!
//! The engine never looks inside the primitive; everything here can be
//! swapped for a hardware kernel that honours the same contract.

mod args;
mod depthwise;
mod error;
mod quant;

pub use args::{KernelArgs, TileView, UnitInfo};
pub use depthwise::DepthwiseConv;
pub use error::KernelError;
pub use quant::{coeff_at, requantize, requantize_mult};

/// The compute-primitive contract.
///
/// `run` is invoked once per execution unit per iteration, SPMD style;
/// the primitive partitions the tile across units internally and may
/// assume all units arrive with identical arguments. It must write
/// exactly the declared output extent and must not read beyond the
/// declared (possibly padded) input extent.
pub trait ComputeKernel: Send + Sync {
    /// Human-readable primitive name.
    fn name(&self) -> &str;

    /// Computes one tile on the currently active buffers.
    fn run(&self, args: &KernelArgs<'_>) -> Result<(), KernelError>;
}
