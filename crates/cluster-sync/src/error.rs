// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for cluster construction.

/// Errors that can occur when building a cluster.
///
/// Once a cluster exists, barrier and unit operations are infallible:
/// a hung unit is an unrecoverable fault at this level, matching the
/// embedded target's behaviour.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// A cluster needs at least one execution unit.
    #[error("cluster must have at least one execution unit")]
    NoUnits,

    /// The requested unit count exceeds what the target class supports.
    #[error("cluster of {requested} units exceeds the supported maximum of {max}")]
    TooManyUnits { requested: usize, max: usize },
}
