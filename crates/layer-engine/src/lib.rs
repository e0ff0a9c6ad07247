// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # layer-engine
//!
//! The tiled, double-buffered execution engine for one convolution layer
//! on a three-tier-memory, multi-core accelerator: drive the tile loop,
//! overlap asynchronous transfers with compute, and keep every execution
//! unit's view of the shared local memory consistent through barriers.
//!
//! ```text
//! LayerEngine<Planned>
//!     │  .prepare(external, local)
//!     ▼
//! LayerEngine<Ready>
//!     │  .run(kernel, dma, cluster)
//!     ▼
//!   RunReport
//! ```
//!
//! # Per-Iteration State Machine
//!
//! ```text
//! PrefetchIssued → Barrier1 → Compute → Barrier2 → WritebackIssued → Advance
//! ```
//!
//! - **PrefetchIssued** — unless this is the final iteration, the leader
//!   unit issues the next tile's input transfer, plus weight and
//!   scale/bias transfers when the channel group changes.
//! - **Barrier1** — all units synchronise; the previous iteration's
//!   compute is fully retired before slots are considered swapped.
//! - **Compute** — the kernel runs on the *currently active* buffers.
//!   Note the one-iteration lag: the tile being computed was prefetched
//!   during the previous iteration.
//! - **Barrier2** — synchronise after compute, before the writeback and
//!   before the active/prefetch roles swap.
//! - **WritebackIssued** — the completed output tile is scattered back to
//!   its external destination.
//! - **Advance** — the single point where double-buffer designations
//!   toggle (weights and quantization vectors only when their reload
//!   condition held) and the loop indices step.
//!
//! After the last iteration a final wait guarantees no tile's output is
//! lost. The engine is stateless between runs.

mod config;
mod engine;
mod error;
mod invoker;
mod orchestrator;
mod params;
mod report;
mod state;

pub use config::LayerSpec;
pub use engine::{EngineState, LayerEngine, Planned, Ready};
pub use error::EngineError;
pub use orchestrator::DmaOrchestrator;
pub use params::{ExternalPlacement, LayerParameters};
pub use report::RunReport;
pub use state::{DoubleBufferState, SlotToggle};
