// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for compute primitives.

/// Errors a compute primitive can report.
///
/// The engine treats any of these as fatal for the layer — there is no
/// partial-result recovery once a tile has started computing.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A buffer's length does not match the declared extents.
    #[error("{what} size mismatch: expected {expected} bytes, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A depthwise primitive requires matching channel counts.
    #[error("depthwise channel mismatch: {input} input vs {output} output channels")]
    ChannelMismatch { input: usize, output: usize },

    /// The unit info is inconsistent (id out of range or zero count).
    #[error("invalid unit info: id {id} of {count}")]
    InvalidUnit { id: usize, count: usize },
}
