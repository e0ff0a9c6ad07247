// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cluster-sync
//!
//! The execution model of the tiled layer engine: a fixed, small number
//! of execution units running the same program in lockstep
//! (single-program-multiple-data), synchronised only through explicit
//! barriers. No message passing, no locks, no dynamic task scheduling.
//!
//! # Key Components
//!
//! - [`UnitCtx`] — what one unit sees of the cluster: its id, the unit
//!   count, [`UnitCtx::barrier`], and the [`UnitCtx::is_leader`]
//!   capability used to elect a single unit for shared transfer issuance.
//! - [`ThreadCluster`] — the host backend: runs the SPMD body on scoped
//!   threads joined by a [`std::sync::Barrier`].
//! - [`visibility_fence`] — the named memory-visibility fence. The engine
//!   invokes it at exactly two points: after issuing a transfer whose
//!   result will be read on the far side of a barrier, and before reading
//!   a buffer that crossed a barrier.
//!
//! # Ordering Guarantees
//!
//! A barrier establishes a total order: every write performed by any unit
//! before the barrier is visible to all units after it. The only blocking
//! operations in the engine are barriers and transfer waits.
//!
//! # Example
//! ```
//! use cluster_sync::ThreadCluster;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let counter = AtomicUsize::new(0);
//! let cluster = ThreadCluster::new(4).unwrap();
//! let seen = cluster.run(|ctx| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     ctx.barrier();
//!     counter.load(Ordering::SeqCst)
//! });
//! // Every unit observes all four increments after the barrier.
//! assert!(seen.iter().all(|&n| n == 4));
//! ```

mod cluster;
mod error;
mod fence;
mod unit;

pub use cluster::ThreadCluster;
pub use error::ClusterError;
pub use fence::visibility_fence;
pub use unit::UnitCtx;
