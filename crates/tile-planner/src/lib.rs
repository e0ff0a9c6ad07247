// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tile-planner
//!
//! Tile geometry for the double-buffered layer engine: given a
//! convolution layer's shape and a tile size, decide how the tensors are
//! cut into local-memory-sized pieces, in what order the pieces are
//! visited, which pieces sit on a padded edge, and how each piece maps to
//! a strided transfer between the memory tiers.
//!
//! # Key Components
//!
//! - [`ConvGeometry`] — the layer shape: spatial dims, channels, kernel,
//!   stride, padding.
//! - [`TileSpec`] — the chosen tile size per axis.
//! - [`TilePlan`] — the validated iteration space. Computes per-tile
//!   extents (including uneven remainder tiles), halo-aware input
//!   windows, padding flags, and worst-case region sizes for the arena.
//! - [`TileDescriptor`] — everything the orchestrator and the kernel
//!   invoker need to know about one tile. Immutable, one per iteration.
//! - [`TileIndices`] — a position in the loop nest, with the weight
//!   reload condition.
//! - [`transfers`] — derives the [`dma_engine::TransferDescriptor`]s for
//!   a tile: per-channel-plane gathers for the position-interleaved
//!   external activations, contiguous runs for weights and quantization
//!   vectors.
//!
//! # Loop Order
//!
//! The nest is fixed: output-channel group (outer) → row tile → column
//! tile → input-channel group (innermost revolution). Weights for a
//! channel group are reused across spatial tiles before being replaced,
//! so a weight transfer is only issued when a channel-group index
//! changes.
//!
//! # Example
//! ```
//! use tile_planner::{ConvGeometry, TilePlan, TileSpec};
//!
//! let geometry = ConvGeometry {
//!     in_h: 16, in_w: 16, channels: 256,
//!     kernel_h: 3, kernel_w: 3, stride: 1, pad: 1,
//! };
//! let spec = TileSpec { out_tile_h: 16, out_tile_w: 16, channel_group: 32 };
//! let plan = TilePlan::new(geometry, spec).unwrap();
//!
//! assert_eq!(plan.total_iterations(), 8); // 8 channel groups, 1×1 spatial
//! let first = plan.describe(plan.first_indices());
//! assert!(first.padding.top && first.padding.bottom);
//! ```

mod descriptor;
mod error;
mod geometry;
mod plan;
pub mod transfers;
mod walker;

pub use descriptor::{Padding, TileBytes, TileDescriptor, TileIndices};
pub use error::PlanError;
pub use geometry::ConvGeometry;
pub use plan::{TilePlan, TileSpec};
pub use walker::TileIter;
