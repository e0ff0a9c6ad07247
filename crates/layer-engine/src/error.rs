// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the layer engine.

/// Errors that can occur while planning, preparing, or running a layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Tile geometry planning failed.
    #[error("planner error: {0}")]
    PlanError(#[from] tile_planner::PlanError),

    /// The arena does not fit the local memory capacity.
    #[error("arena error: {0}")]
    ArenaError(#[from] tile_arena::ArenaError),

    /// A transfer failed (host backend: bounds or handle protocol).
    #[error("transfer error: {0}")]
    DmaError(#[from] dma_engine::DmaError),

    /// The compute primitive rejected its arguments or failed.
    #[error("kernel error: {0}")]
    KernelError(#[from] conv_kernels::KernelError),

    /// The cluster could not be built.
    #[error("cluster error: {0}")]
    ClusterError(#[from] cluster_sync::ClusterError),

    /// A memory tier is too small for the staged layer.
    #[error("{tier} memory too small: need {required} bytes, have {available}")]
    TierTooSmall {
        tier: &'static str,
        required: usize,
        available: usize,
    },

    /// Configuration parsing failed.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
