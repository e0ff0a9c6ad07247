// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host reference implementation of the transfer engine.
//!
//! [`HostDma`] performs the strided copy synchronously inside `issue`,
//! which makes runs deterministic and keeps the double-buffer protocol
//! honest: a prefetch that the scheduler forgot to `wait` on leaks its
//! handle (visible via [`HostDma::pending`]), and waiting twice or on a
//! foreign handle is a typed error. Data-ordering bugs that would corrupt
//! results on real hardware therefore surface as assertion failures in
//! tests.

use crate::{
    Direction, DmaError, ExternalMemory, LocalMemory, TransferDescriptor, TransferEngine,
    TransferHandle, TransferStats,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Software transfer engine over a pair of memory tiers.
pub struct HostDma {
    ext: Arc<ExternalMemory>,
    loc: Arc<LocalMemory>,
    next_handle: AtomicU64,
    pending: Mutex<HashSet<u64>>,
    stats: Mutex<TransferStats>,
}

impl HostDma {
    /// Creates an engine copying between `ext` and `loc`.
    pub fn new(ext: Arc<ExternalMemory>, loc: Arc<LocalMemory>) -> Self {
        Self {
            ext,
            loc,
            next_handle: AtomicU64::new(1),
            pending: Mutex::new(HashSet::new()),
            stats: Mutex::new(TransferStats::default()),
        }
    }

    /// Snapshot of the cumulative transfer statistics.
    pub fn stats(&self) -> TransferStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of issued transfers not yet waited on.
    ///
    /// After a complete engine run this must be zero: every handle the
    /// scheduler created was consumed by a `wait`.
    pub fn pending(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn check_bounds(&self, d: &TransferDescriptor) -> Result<(), DmaError> {
        if d.ext_end() > self.ext.len() {
            return Err(DmaError::OutOfBounds {
                tier: "external",
                end_byte: d.ext_end(),
                tier_bytes: self.ext.len(),
            });
        }
        if d.loc_end() > self.loc.len() {
            return Err(DmaError::OutOfBounds {
                tier: "local",
                end_byte: d.loc_end(),
                tier_bytes: self.loc.len(),
            });
        }
        Ok(())
    }

    fn copy(&self, d: &TransferDescriptor) {
        let ext = self.ext.raw_ptr();
        let loc = self.loc.raw_ptr();
        for o in 0..d.outer_count {
            for i in 0..d.inner_count {
                let ext_off = d.ext_offset + o * d.ext_outer_stride + i * d.ext_inner_stride;
                let loc_off = d.loc_offset + o * d.loc_outer_stride + i * d.loc_inner_stride;
                // Safety: both ranges were bounds-checked against the tier
                // sizes in `check_bounds`; exclusivity of the destination
                // range is the engine's barrier-discipline obligation.
                unsafe {
                    match d.direction {
                        Direction::ExtToLoc => std::ptr::copy_nonoverlapping(
                            ext.add(ext_off),
                            loc.add(loc_off),
                            d.elem_bytes,
                        ),
                        Direction::LocToExt => std::ptr::copy_nonoverlapping(
                            loc.add(loc_off),
                            ext.add(ext_off),
                            d.elem_bytes,
                        ),
                    }
                }
            }
        }
    }
}

impl TransferEngine for HostDma {
    fn issue(&self, descriptor: &TransferDescriptor) -> Result<TransferHandle, DmaError> {
        descriptor.validate()?;
        self.check_bounds(descriptor)?;

        // The host backend completes the copy eagerly; the handle protocol
        // below still models the asynchronous contract.
        self.copy(descriptor);

        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(id);
        }
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_issue(descriptor.direction, descriptor.total_bytes());
        }
        tracing::trace!(
            handle = id,
            dir = ?descriptor.direction,
            bytes = descriptor.total_bytes(),
            "transfer issued"
        );
        Ok(TransferHandle(id))
    }

    fn wait(&self, handle: TransferHandle) -> Result<(), DmaError> {
        let removed = self
            .pending
            .lock()
            .map(|mut p| p.remove(&handle.0))
            .unwrap_or(false);
        if !removed {
            return Err(DmaError::UnknownHandle(handle.0));
        }
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_wait();
        }
        Ok(())
    }
}

impl std::fmt::Debug for HostDma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostDma")
            .field("external_bytes", &self.ext.len())
            .field("local_bytes", &self.loc.len())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers(ext: usize, loc: usize) -> (Arc<ExternalMemory>, Arc<LocalMemory>) {
        (
            Arc::new(ExternalMemory::new(ext)),
            Arc::new(LocalMemory::new(loc)),
        )
    }

    #[test]
    fn test_contiguous_prefetch() {
        let (ext, loc) = tiers(64, 64);
        ext.write(8, &[1, 2, 3, 4]);
        let dma = HostDma::new(Arc::clone(&ext), Arc::clone(&loc));

        let d = TransferDescriptor::contiguous(Direction::ExtToLoc, 8, 16, 4);
        let h = dma.issue(&d).unwrap();
        dma.wait(h).unwrap();

        assert_eq!(loc.read(16, 4), vec![1, 2, 3, 4]);
        assert_eq!(dma.pending(), 0);
    }

    #[test]
    fn test_writeback() {
        let (ext, loc) = tiers(64, 64);
        loc.write(0, &[7, 7, 7]);
        let dma = HostDma::new(Arc::clone(&ext), Arc::clone(&loc));

        let d = TransferDescriptor::contiguous(Direction::LocToExt, 32, 0, 3);
        let h = dma.issue(&d).unwrap();
        dma.wait(h).unwrap();

        assert_eq!(ext.read(32, 3), vec![7, 7, 7]);
    }

    #[test]
    fn test_interleaved_gather() {
        // External layout: 4 positions × 3 channels, interleaved by
        // position. Gather channel 1 into a packed local run.
        let (ext, loc) = tiers(12, 4);
        ext.write(0, &[10, 11, 12, 20, 21, 22, 30, 31, 32, 40, 41, 42]);
        let dma = HostDma::new(Arc::clone(&ext), Arc::clone(&loc));

        let d = TransferDescriptor {
            direction: Direction::ExtToLoc,
            ext_offset: 1, // channel 1
            loc_offset: 0,
            elem_bytes: 1,
            inner_count: 4,
            ext_inner_stride: 3,
            loc_inner_stride: 1,
            outer_count: 1,
            ext_outer_stride: 12,
            loc_outer_stride: 4,
        };
        let h = dma.issue(&d).unwrap();
        dma.wait(h).unwrap();

        assert_eq!(loc.read(0, 4), vec![11, 21, 31, 41]);
    }

    #[test]
    fn test_scatter_back() {
        // Inverse of the gather: packed local run → interleaved external.
        let (ext, loc) = tiers(12, 4);
        loc.write(0, &[91, 92, 93, 94]);
        let dma = HostDma::new(Arc::clone(&ext), Arc::clone(&loc));

        let d = TransferDescriptor {
            direction: Direction::LocToExt,
            ext_offset: 2,
            loc_offset: 0,
            elem_bytes: 1,
            inner_count: 4,
            ext_inner_stride: 3,
            loc_inner_stride: 1,
            outer_count: 1,
            ext_outer_stride: 12,
            loc_outer_stride: 4,
        };
        dma.wait(dma.issue(&d).unwrap()).unwrap();

        let out = ext.read(0, 12);
        assert_eq!(out[2], 91);
        assert_eq!(out[5], 92);
        assert_eq!(out[8], 93);
        assert_eq!(out[11], 94);
    }

    #[test]
    fn test_out_of_bounds_external() {
        let (ext, loc) = tiers(16, 64);
        let dma = HostDma::new(ext, loc);
        let d = TransferDescriptor::contiguous(Direction::ExtToLoc, 8, 0, 16);
        assert!(matches!(
            dma.issue(&d),
            Err(DmaError::OutOfBounds { tier: "external", .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_local() {
        let (ext, loc) = tiers(64, 8);
        let dma = HostDma::new(ext, loc);
        let d = TransferDescriptor::contiguous(Direction::ExtToLoc, 0, 4, 8);
        assert!(matches!(
            dma.issue(&d),
            Err(DmaError::OutOfBounds { tier: "local", .. })
        ));
    }

    #[test]
    fn test_double_wait_is_error() {
        let (ext, loc) = tiers(16, 16);
        let dma = HostDma::new(ext, loc);
        let h = dma
            .issue(&TransferDescriptor::contiguous(Direction::ExtToLoc, 0, 0, 4))
            .unwrap();
        dma.wait(h).unwrap();
        assert!(matches!(dma.wait(h), Err(DmaError::UnknownHandle(_))));
    }

    #[test]
    fn test_stats_accumulate() {
        let (ext, loc) = tiers(64, 64);
        let dma = HostDma::new(ext, loc);
        let d_in = TransferDescriptor::contiguous(Direction::ExtToLoc, 0, 0, 32);
        let d_out = TransferDescriptor::contiguous(Direction::LocToExt, 0, 0, 8);
        dma.wait(dma.issue(&d_in).unwrap()).unwrap();
        dma.wait(dma.issue(&d_out).unwrap()).unwrap();

        let stats = dma.stats();
        assert_eq!(stats.issued_in, 1);
        assert_eq!(stats.bytes_in, 32);
        assert_eq!(stats.issued_out, 1);
        assert_eq!(stats.bytes_out, 8);
        assert_eq!(stats.waits, 2);
    }
}
