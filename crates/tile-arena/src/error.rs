// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for arena layout planning.

use crate::TensorRole;

/// Errors that can occur while planning an arena layout.
///
/// All of these are layer-generation-time failures: once an
/// [`crate::ArenaLayout`] exists, the regions it describes are valid for
/// the lifetime of the layer and no further checks are performed.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// The requested regions do not fit the local memory capacity.
    #[error("arena does not fit: {required_bytes} bytes required, capacity is {capacity_bytes}")]
    CapacityExceeded {
        required_bytes: usize,
        capacity_bytes: usize,
    },

    /// A double-buffered role was requested with a zero byte size.
    #[error("region for {role} has zero size")]
    ZeroSizedRegion { role: TensorRole },

    /// Two scratch regions share the same name.
    #[error("duplicate scratch region '{0}'")]
    DuplicateScratch(String),

    /// A scratch region was requested with a zero byte size.
    #[error("scratch region '{0}' has zero size")]
    ZeroSizedScratch(String),
}
