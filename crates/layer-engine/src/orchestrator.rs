// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The double-buffer DMA orchestrator.
//!
//! Translates tile descriptors into issued transfers against the arena's
//! slots. All geometry comes from `tile_planner::transfers`; the
//! orchestrator only selects destination slots and groups the resulting
//! handles into batches.
//!
//! Slot discipline: prefetch operations take the *slot the scheduler
//! designates*. In the steady-state loop that is always the role's
//! prefetch slot, never the active one; only the pre-loop fill targets
//! the initial active slot, before any compute has consumed it.
//! Writebacks read `state.output().active()`.

use crate::LayerParameters;
use dma_engine::{DmaError, TransferBatch, TransferEngine};
use tile_arena::{ArenaLayout, SlotIndex, TensorRole};
use tile_planner::{transfers, TileDescriptor, TilePlan};

/// Issues the transfers of one layer run.
pub struct DmaOrchestrator<'a> {
    plan: &'a TilePlan,
    layout: &'a ArenaLayout,
    params: &'a LayerParameters,
    dma: &'a dyn TransferEngine,
}

impl<'a> DmaOrchestrator<'a> {
    /// Binds the orchestrator to a plan, an arena layout, and a transfer
    /// engine.
    pub fn new(
        plan: &'a TilePlan,
        layout: &'a ArenaLayout,
        params: &'a LayerParameters,
        dma: &'a dyn TransferEngine,
    ) -> Self {
        Self {
            plan,
            layout,
            params,
            dma,
        }
    }

    /// Issues the input-tile prefetch into `slot`. Non-blocking.
    ///
    /// One gather per channel plane of the tile; the returned batch
    /// carries all of their handles.
    pub fn prefetch_input(
        &self,
        tile: &TileDescriptor,
        slot: SlotIndex,
    ) -> Result<TransferBatch, DmaError> {
        let dest = self.layout.slot(TensorRole::Input, slot);
        let mut batch = TransferBatch::new();
        for descriptor in
            transfers::input_prefetch(self.plan, tile, self.params.placement.input, dest.offset)
        {
            batch.push(self.dma.issue(&descriptor)?);
        }
        tracing::trace!(
            tile = ?tile.indices,
            slot = %slot,
            planes = batch.len(),
            "input prefetch issued"
        );
        Ok(batch)
    }

    /// Issues the weight-tile prefetch into `slot`. Non-blocking.
    pub fn prefetch_weights(
        &self,
        tile: &TileDescriptor,
        slot: SlotIndex,
    ) -> Result<TransferBatch, DmaError> {
        let dest = self.layout.slot(TensorRole::Weight, slot);
        let descriptor =
            transfers::weight_prefetch(self.plan, tile, self.params.placement.weights, dest.offset);
        let mut batch = TransferBatch::new();
        batch.push(self.dma.issue(&descriptor)?);
        Ok(batch)
    }

    /// Stages the quantization scale and bias vectors for `tile`'s
    /// channel group into `slot`. Non-blocking; issued by the leader
    /// unit only.
    pub fn stage_coefficients(
        &self,
        tile: &TileDescriptor,
        slot: SlotIndex,
    ) -> Result<TransferBatch, DmaError> {
        let scale_dest = self.layout.slot(TensorRole::Scale, slot);
        let bias_dest = self.layout.slot(TensorRole::Bias, slot);
        let mut batch = TransferBatch::new();
        batch.push(self.dma.issue(&transfers::coeff_prefetch(
            tile,
            self.params.placement.scale,
            scale_dest.offset,
        ))?);
        batch.push(self.dma.issue(&transfers::coeff_prefetch(
            tile,
            self.params.placement.bias,
            bias_dest.offset,
        ))?);
        Ok(batch)
    }

    /// Issues the writeback of the completed output tile in `slot` to
    /// its external destination. Non-blocking.
    pub fn writeback(
        &self,
        tile: &TileDescriptor,
        slot: SlotIndex,
    ) -> Result<TransferBatch, DmaError> {
        let src = self.layout.slot(TensorRole::Output, slot);
        let mut batch = TransferBatch::new();
        for descriptor in
            transfers::output_writeback(self.plan, tile, self.params.placement.output, src.offset)
        {
            batch.push(self.dma.issue(&descriptor)?);
        }
        tracing::trace!(
            tile = ?tile.indices,
            slot = %slot,
            bytes = tile.bytes.output,
            "writeback issued"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExternalPlacement;
    use dma_engine::{ExternalMemory, HostDma, LocalMemory};
    use std::sync::Arc;
    use tile_planner::{ConvGeometry, TileSpec};

    fn setup() -> (TilePlan, ArenaLayout, LayerParameters, Arc<ExternalMemory>, Arc<LocalMemory>) {
        let geometry = ConvGeometry {
            in_h: 8,
            in_w: 8,
            channels: 4,
            kernel_h: 3,
            kernel_w: 3,
            stride: 1,
            pad: 1,
        };
        let plan = TilePlan::new(
            geometry,
            TileSpec {
                out_tile_h: 8,
                out_tile_w: 8,
                channel_group: 2,
            },
        )
        .unwrap();
        let layout = ArenaLayout::plan(&plan.region_request(vec![]), 64 * 1024).unwrap();
        let placement = ExternalPlacement::contiguous(&geometry);
        let params = LayerParameters {
            placement,
            out_shift: 0,
            out_mult: 1,
        };
        let ext = Arc::new(ExternalMemory::new(placement.total_bytes));
        let loc = Arc::new(LocalMemory::new(layout.total_bytes()));
        (plan, layout, params, ext, loc)
    }

    #[test]
    fn test_prefetch_lands_in_requested_slot() {
        let (plan, layout, params, ext, loc) = setup();
        // Distinguishable input bytes.
        for i in 0..plan.geometry().input_bytes() {
            ext.write(params.placement.input + i, &[(i % 251) as u8]);
        }
        let dma = HostDma::new(Arc::clone(&ext), Arc::clone(&loc));
        let orch = DmaOrchestrator::new(&plan, &layout, &params, &dma);

        let tile = plan.describe(plan.first_indices());
        let batch = orch.prefetch_input(&tile, SlotIndex::B).unwrap();
        assert_eq!(batch.len(), tile.group_channels);
        batch.wait_all(&dma).unwrap();

        // Slot B received data; slot A untouched.
        let [a, b] = layout.slot_pair(TensorRole::Input);
        assert!(loc.read(b.offset, tile.bytes.input).iter().any(|&v| v != 0));
        assert!(loc.read(a.offset, tile.bytes.input).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_coefficient_staging_pair() {
        let (plan, layout, params, ext, loc) = setup();
        let g = plan.geometry();
        for c in 0..g.channels {
            ext.write(params.placement.scale + c * 4, &(c as i32 + 1).to_le_bytes());
            ext.write(params.placement.bias + c * 4, &(-(c as i32)).to_le_bytes());
        }
        let dma = HostDma::new(Arc::clone(&ext), Arc::clone(&loc));
        let orch = DmaOrchestrator::new(&plan, &layout, &params, &dma);

        // Second channel group: channels 2..4.
        let tile = plan.describe(tile_planner::TileIndices {
            group: 1,
            ..tile_planner::TileIndices::ZERO
        });
        let batch = orch.stage_coefficients(&tile, SlotIndex::A).unwrap();
        assert_eq!(batch.len(), 2);
        batch.wait_all(&dma).unwrap();

        let scale_slot = layout.slot(TensorRole::Scale, SlotIndex::A);
        let staged = loc.read(scale_slot.offset, 8);
        assert_eq!(conv_kernels::coeff_at(&staged, 0), 3);
        assert_eq!(conv_kernels::coeff_at(&staged, 1), 4);
    }

    #[test]
    fn test_writeback_roundtrip() {
        let (plan, layout, params, ext, loc) = setup();
        let tile = plan.describe(plan.first_indices());
        let out_slot = layout.slot(TensorRole::Output, SlotIndex::A);
        for i in 0..tile.bytes.output {
            loc.write(out_slot.offset + i, &[(i % 200 + 1) as u8]);
        }
        let dma = HostDma::new(Arc::clone(&ext), Arc::clone(&loc));
        let orch = DmaOrchestrator::new(&plan, &layout, &params, &dma);

        let batch = orch.writeback(&tile, SlotIndex::A).unwrap();
        batch.wait_all(&dma).unwrap();

        let stats = dma.stats();
        assert_eq!(stats.bytes_out as usize, tile.bytes.output);
        // First output element of channel 0 lands at the interleaved base.
        assert_eq!(ext.read(params.placement.output, 1), loc.read(out_slot.offset, 1));
    }
}
