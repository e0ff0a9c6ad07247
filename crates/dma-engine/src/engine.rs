// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The transfer-engine contract and handle types.

use crate::{DmaError, TransferDescriptor};

/// An opaque token identifying one issued transfer.
///
/// Returned by [`TransferEngine::issue`]; consumed by
/// [`TransferEngine::wait`]. A handle must be waited on exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TransferHandle(pub(crate) u64);

impl TransferHandle {
    /// Raw handle value, for diagnostics.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The block-transfer hardware contract.
///
/// `issue` must not block: it enqueues the strided copy and returns
/// immediately. `wait` blocks the calling execution unit until the named
/// transfer is complete. Any unit may wait on a handle, but the engine
/// convention is that the issuing unit waits and barriers provide
/// visibility for the rest of the cluster.
pub trait TransferEngine: Send + Sync {
    /// Starts the copy described by `descriptor`. Non-blocking.
    fn issue(&self, descriptor: &TransferDescriptor) -> Result<TransferHandle, DmaError>;

    /// Blocks until the transfer identified by `handle` has completed.
    fn wait(&self, handle: TransferHandle) -> Result<(), DmaError>;
}

/// The handles of one logical orchestrator operation.
///
/// Spatial tensors are moved one channel plane per descriptor, so a
/// single tile prefetch or writeback fans out into several hardware
/// transfers sharing one completion event. A `TransferBatch` groups them
/// so the scheduler can wait on the whole operation.
#[derive(Debug, Default)]
pub struct TransferBatch {
    handles: Vec<TransferHandle>,
}

impl TransferBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handle to the batch.
    pub fn push(&mut self, handle: TransferHandle) {
        self.handles.push(handle);
    }

    /// Number of hardware transfers in this batch.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if the batch contains no transfers.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits on every transfer in the batch, consuming it.
    pub fn wait_all(self, engine: &dyn TransferEngine) -> Result<(), DmaError> {
        for handle in self.handles {
            engine.wait(handle)?;
        }
        Ok(())
    }
}
