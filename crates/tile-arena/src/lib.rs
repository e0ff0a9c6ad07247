// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tile-arena
//!
//! A fixed-region arena describing how the fast local memory tier of a
//! tiled layer execution engine is carved up.
//!
//! On the target class of accelerators the local tier is a small scratchpad
//! (tens of KB) shared by all execution units. Every tensor role that is
//! streamed through it — input tiles, weight tiles, quantization scale and
//! bias vectors, output tiles — owns **two** slots so that one slot can be
//! filled by an asynchronous transfer while the other is consumed by
//! compute. Scratch workspaces (e.g. an im2col staging area) own a single
//! fixed region.
//!
//! # Key Components
//!
//! - [`RegionRequest`] — worst-case byte sizes per tensor role, plus any
//!   named scratch regions.
//! - [`ArenaLayout`] — the computed, immutable offset map. Built once at
//!   layer-generation time; if the request does not fit the capacity,
//!   [`ArenaLayout::plan`] fails and the layer is never generated.
//! - [`BufferSlot`] — one of the two regions backing a double-buffered
//!   role.
//!
//! # Design
//!
//! Offsets are computed by the arena, never hand-coded: the engine indexes
//! regions symbolically (`layout.slot(TensorRole::Input, SlotIndex::B)`)
//! and the arena guarantees the regions are non-overlapping and within
//! capacity. There are no runtime bounds checks downstream — fitting is
//! proven here or the layout is refused.
//!
//! # Example
//! ```
//! use tile_arena::{ArenaLayout, RegionRequest, SlotIndex, TensorRole};
//!
//! let request = RegionRequest {
//!     input_bytes: 8192,
//!     weight_bytes: 288,
//!     scale_bytes: 128,
//!     bias_bytes: 128,
//!     output_bytes: 8192,
//!     scratch: vec![("im2col".into(), 456)],
//! };
//! let layout = ArenaLayout::plan(&request, 64 * 1024).unwrap();
//!
//! let a = layout.slot(TensorRole::Input, SlotIndex::A);
//! let b = layout.slot(TensorRole::Input, SlotIndex::B);
//! assert!(a.end() <= b.offset || b.end() <= a.offset);
//! ```

mod error;
mod layout;
mod region;

pub use error::ArenaError;
pub use layout::ArenaLayout;
pub use region::{BufferSlot, RegionRequest, ScratchSlot, SlotIndex, TensorRole};
