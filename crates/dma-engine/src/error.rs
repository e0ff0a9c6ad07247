// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the transfer engine.

/// Errors that can occur when issuing or waiting on transfers.
///
/// On the real target a faulted transfer is fatal to the process; the
/// host backend reports these as typed errors so tests can assert on the
/// exact failure instead of aborting.
#[derive(Debug, thiserror::Error)]
pub enum DmaError {
    /// The descriptor describes a copy of zero bytes.
    #[error("transfer moves zero bytes")]
    EmptyTransfer,

    /// The descriptor's footprint exceeds a memory tier.
    #[error("{tier} access out of bounds: transfer touches byte {end_byte}, tier is {tier_bytes} bytes")]
    OutOfBounds {
        tier: &'static str,
        end_byte: usize,
        tier_bytes: usize,
    },

    /// `wait` was called with a handle that was never issued, or that was
    /// already waited on.
    #[error("unknown transfer handle {0}")]
    UnknownHandle(u64),
}
