// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena layout planning: turning a [`RegionRequest`] into fixed offsets.

use crate::{ArenaError, BufferSlot, RegionRequest, ScratchSlot, SlotIndex, TensorRole};

/// Byte alignment for every region boundary.
///
/// Matches the word size of the scale/bias vectors (i32); keeping all
/// regions word-aligned lets the compute primitive read them directly.
const REGION_ALIGN: usize = 4;

fn align_up(offset: usize) -> usize {
    (offset + REGION_ALIGN - 1) & !(REGION_ALIGN - 1)
}

/// The immutable offset map for one layer's local memory.
///
/// Created once by [`ArenaLayout::plan`]; consulted by the DMA
/// orchestrator (transfer destinations) and the kernel invoker (compute
/// pointers). Regions never move and are never reallocated — only the
/// active/prefetch designation of each role's slot pair changes at
/// runtime, and that state lives in the execution engine, not here.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArenaLayout {
    slots: Vec<BufferSlot>,
    scratch: Vec<ScratchSlot>,
    total_bytes: usize,
    capacity_bytes: usize,
}

impl ArenaLayout {
    /// Computes offsets for every region in `request`.
    ///
    /// Placement order is [`TensorRole::ALL`] (both slots of a role are
    /// adjacent), followed by the scratch regions in request order. Every
    /// region starts on a 4-byte boundary.
    ///
    /// # Errors
    /// - [`ArenaError::ZeroSizedRegion`] / [`ArenaError::ZeroSizedScratch`]
    ///   if any requested region is empty.
    /// - [`ArenaError::DuplicateScratch`] if two scratch names collide.
    /// - [`ArenaError::CapacityExceeded`] if the total does not fit
    ///   `capacity_bytes`. This is the layer-generation-time capacity
    ///   check: a layer whose plan fails here must never be emitted.
    pub fn plan(request: &RegionRequest, capacity_bytes: usize) -> Result<ArenaLayout, ArenaError> {
        for role in TensorRole::ALL {
            if request.role_bytes(role) == 0 {
                return Err(ArenaError::ZeroSizedRegion { role });
            }
        }

        let mut offset = 0usize;
        let mut slots = Vec::with_capacity(TensorRole::ALL.len() * 2);
        for role in TensorRole::ALL {
            let size = request.role_bytes(role);
            for index in [SlotIndex::A, SlotIndex::B] {
                slots.push(BufferSlot {
                    role,
                    index,
                    offset,
                    size,
                });
                offset = align_up(offset + size);
            }
        }

        let mut scratch = Vec::with_capacity(request.scratch.len());
        for (name, size) in &request.scratch {
            if *size == 0 {
                return Err(ArenaError::ZeroSizedScratch(name.clone()));
            }
            if scratch.iter().any(|s: &ScratchSlot| &s.name == name) {
                return Err(ArenaError::DuplicateScratch(name.clone()));
            }
            scratch.push(ScratchSlot {
                name: name.clone(),
                offset,
                size: *size,
            });
            offset = align_up(offset + size);
        }

        let total_bytes = offset;
        if total_bytes > capacity_bytes {
            return Err(ArenaError::CapacityExceeded {
                required_bytes: total_bytes,
                capacity_bytes,
            });
        }

        Ok(ArenaLayout {
            slots,
            scratch,
            total_bytes,
            capacity_bytes,
        })
    }

    /// Returns the slot for `role`/`index`.
    pub fn slot(&self, role: TensorRole, index: SlotIndex) -> BufferSlot {
        // The constructor places exactly one slot per (role, index).
        *self
            .slots
            .iter()
            .find(|s| s.role == role && s.index == index)
            .expect("layout contains every (role, index) pair")
    }

    /// Returns both slots of a role, `[A, B]`.
    pub fn slot_pair(&self, role: TensorRole) -> [BufferSlot; 2] {
        [self.slot(role, SlotIndex::A), self.slot(role, SlotIndex::B)]
    }

    /// Looks up a scratch region by name.
    pub fn scratch(&self, name: &str) -> Option<&ScratchSlot> {
        self.scratch.iter().find(|s| s.name == name)
    }

    /// All double-buffered slots, in placement order.
    pub fn slots(&self) -> &[BufferSlot] {
        &self.slots
    }

    /// All scratch regions, in placement order.
    pub fn scratch_regions(&self) -> &[ScratchSlot] {
        &self.scratch
    }

    /// Total bytes occupied (end of the last region).
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// The capacity the layout was planned against.
    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    /// Returns a human-readable summary of the layout.
    pub fn summary(&self) -> String {
        let used_pct = self.total_bytes as f64 / self.capacity_bytes as f64 * 100.0;
        let mut parts: Vec<String> = self
            .slots
            .iter()
            .map(|s| format!("{}[{}]@{}+{}", s.role, s.index, s.offset, s.size))
            .collect();
        parts.extend(
            self.scratch
                .iter()
                .map(|s| format!("{}@{}+{}", s.name, s.offset, s.size)),
        );
        format!(
            "Arena: {}/{} bytes ({used_pct:.0}%), {}",
            self.total_bytes,
            self.capacity_bytes,
            parts.join(", "),
        )
    }
}
