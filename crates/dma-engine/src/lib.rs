// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # dma-engine
//!
//! The asynchronous block-transfer boundary of the tiled layer execution
//! engine: 2-level strided copies between a large, slow *external* memory
//! tier and the small, fast *local* tier.
//!
//! # Key Components
//!
//! - [`TransferDescriptor`] — an ephemeral description of one strided
//!   copy: offsets in both tiers, a contiguous element run, and inner and
//!   outer stride/count pairs per tier. Derived entirely from tile
//!   geometry; this crate never recomputes tensor shapes.
//! - [`TransferEngine`] — the hardware contract: `issue` is non-blocking
//!   and returns a [`TransferHandle`]; `wait` blocks the calling execution
//!   unit until the named transfer has completed.
//! - [`TransferBatch`] — the handles of one logical operation (e.g. the
//!   per-channel-plane copies of a single input-tile prefetch), waited on
//!   as a unit.
//! - [`HostDma`] — the software reference backend operating on
//!   [`ExternalMemory`] / [`LocalMemory`] byte tiers. It completes copies
//!   synchronously at issue time but enforces the full handle protocol,
//!   so ordering mistakes surface as typed errors in tests instead of
//!   silent corruption.
//! - [`TransferStats`] — cumulative issue/wait counters and byte volumes
//!   per direction, used by the scheduler's run report and by tests.
//!
//! # Concurrency
//!
//! The memory tiers are shared by all execution units of the cluster.
//! Safety relies on the engine's barrier discipline: between two barriers,
//! a byte range is touched by at most one writer, and readers only see
//! ranges whose filling transfer was waited on before the barrier.

mod descriptor;
mod engine;
mod error;
mod host;
mod memory;
mod stats;

pub use descriptor::{Direction, TransferDescriptor};
pub use engine::{TransferBatch, TransferEngine, TransferHandle};
pub use error::DmaError;
pub use host::HostDma;
pub use memory::{ExternalMemory, LocalMemory};
pub use stats::TransferStats;
