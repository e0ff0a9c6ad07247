// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The execution scheduler, with a type-state–enforced pipeline.
//!
//! ```text
//! LayerEngine::plan(...)          — geometry + arena fit (generation time)
//!     │  .prepare(external, local) — bind tiers, validate every transfer
//!     ▼
//! LayerEngine<Ready>
//!     │  .run(kernel, dma, cluster)
//!     ▼
//!   RunReport
//! ```
//!
//! Everything fallible happens in `plan` and `prepare`: tile geometry,
//! arena capacity, and the byte footprint of every transfer the run will
//! ever issue are proven valid up front. The SPMD loop itself performs no
//! bounds checks — exactly like the generated layers it models — and
//! treats a transfer fault inside the loop as an unrecoverable invariant
//! violation.

use crate::{
    invoker, DmaOrchestrator, DoubleBufferState, EngineError, LayerParameters, RunReport,
};
use cluster_sync::{visibility_fence, ThreadCluster, UnitCtx};
use conv_kernels::{ComputeKernel, UnitInfo};
use dma_engine::{ExternalMemory, LocalMemory, TransferBatch, TransferEngine};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tile_arena::{ArenaLayout, SlotIndex};
use tile_planner::{transfers, ConvGeometry, TilePlan, TileSpec};

/// Message for faults that `prepare` proved impossible.
const PREVALIDATED: &str = "transfer validated at prepare time";

// ── Type-state markers ─────────────────────────────────────────

/// Plan exists; memory tiers are not yet bound.
#[derive(Debug)]
pub struct Planned;

/// Tiers bound and every transfer footprint validated.
#[derive(Debug)]
pub struct Ready;

/// Sealed trait for engine states.
pub trait EngineState: std::fmt::Debug {}
impl EngineState for Planned {}
impl EngineState for Ready {}

// ── Engine ─────────────────────────────────────────────────────

/// The tiled double-buffered execution engine for one layer.
///
/// `S` is a type-state marker enforcing the pipeline order at compile
/// time: `run` only exists on a `Ready` engine.
pub struct LayerEngine<S: EngineState = Planned> {
    plan: TilePlan,
    layout: ArenaLayout,
    params: LayerParameters,
    _state: PhantomData<S>,
    external: Option<Arc<ExternalMemory>>,
    local: Option<Arc<LocalMemory>>,
}

// ── Planned ────────────────────────────────────────────────────

impl LayerEngine<Planned> {
    /// Plans a layer: builds the tile plan and the arena layout.
    ///
    /// This is the layer-generation-time gate: if the worst-case tile
    /// regions do not fit `local_capacity`, the error propagates here
    /// and no engine exists to run.
    pub fn plan(
        geometry: ConvGeometry,
        spec: TileSpec,
        params: LayerParameters,
        local_capacity: usize,
        scratch: Vec<(String, usize)>,
    ) -> Result<LayerEngine<Planned>, EngineError> {
        let plan = TilePlan::new(geometry, spec)?;
        let layout = ArenaLayout::plan(&plan.region_request(scratch), local_capacity)?;
        tracing::info!("{}", plan.summary());
        tracing::info!("{}", layout.summary());
        Ok(LayerEngine {
            plan,
            layout,
            params,
            _state: PhantomData,
            external: None,
            local: None,
        })
    }

    /// Binds the memory tiers and validates the footprint of every
    /// transfer the run will issue. Transitions to `Ready`.
    pub fn prepare(
        self,
        external: Arc<ExternalMemory>,
        local: Arc<LocalMemory>,
    ) -> Result<LayerEngine<Ready>, EngineError> {
        if local.len() < self.layout.total_bytes() {
            return Err(EngineError::TierTooSmall {
                tier: "local",
                required: self.layout.total_bytes(),
                available: local.len(),
            });
        }
        if external.len() < self.params.placement.total_bytes {
            return Err(EngineError::TierTooSmall {
                tier: "external",
                required: self.params.placement.total_bytes,
                available: external.len(),
            });
        }

        let (max_ext, max_loc) = self.max_transfer_ends();
        if max_ext > external.len() {
            return Err(EngineError::TierTooSmall {
                tier: "external",
                required: max_ext,
                available: external.len(),
            });
        }
        if max_loc > local.len() {
            return Err(EngineError::TierTooSmall {
                tier: "local",
                required: max_loc,
                available: local.len(),
            });
        }

        Ok(LayerEngine {
            plan: self.plan,
            layout: self.layout,
            params: self.params,
            _state: PhantomData,
            external: Some(external),
            local: Some(local),
        })
    }

    /// The largest byte offset any transfer of the run touches, per tier.
    fn max_transfer_ends(&self) -> (usize, usize) {
        let mut max_ext = 0usize;
        let mut max_loc = 0usize;
        let mut track = |descriptors: &[dma_engine::TransferDescriptor]| {
            for d in descriptors {
                max_ext = max_ext.max(d.ext_end());
                max_loc = max_loc.max(d.loc_end());
            }
        };

        let placement = &self.params.placement;
        for indices in self.plan.iter() {
            let tile = self.plan.describe(indices);
            for slot in [SlotIndex::A, SlotIndex::B] {
                let input = self.layout.slot(tile_arena::TensorRole::Input, slot);
                track(&transfers::input_prefetch(
                    &self.plan,
                    &tile,
                    placement.input,
                    input.offset,
                ));
                let weight = self.layout.slot(tile_arena::TensorRole::Weight, slot);
                track(&[transfers::weight_prefetch(
                    &self.plan,
                    &tile,
                    placement.weights,
                    weight.offset,
                )]);
                let scale = self.layout.slot(tile_arena::TensorRole::Scale, slot);
                let bias = self.layout.slot(tile_arena::TensorRole::Bias, slot);
                track(&[
                    transfers::coeff_prefetch(&tile, placement.scale, scale.offset),
                    transfers::coeff_prefetch(&tile, placement.bias, bias.offset),
                ]);
                let output = self.layout.slot(tile_arena::TensorRole::Output, slot);
                track(&transfers::output_writeback(
                    &self.plan,
                    &tile,
                    placement.output,
                    output.offset,
                ));
            }
        }
        (max_ext, max_loc)
    }
}

// ── Shared accessors ───────────────────────────────────────────

impl<S: EngineState> LayerEngine<S> {
    /// The tile plan this engine executes.
    pub fn tile_plan(&self) -> &TilePlan {
        &self.plan
    }

    /// The arena layout of the local tier.
    pub fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    /// The layer parameters.
    pub fn params(&self) -> &LayerParameters {
        &self.params
    }
}

// ── Ready: run the layer ───────────────────────────────────────

/// Leader-side operation counters, folded into the run report.
#[derive(Debug, Default)]
struct LeaderCounters {
    input_prefetches: usize,
    weight_reloads: usize,
    coeff_stagings: usize,
    writebacks: usize,
    writeback_bytes: Vec<usize>,
}

fn slot_idx(slot: SlotIndex) -> usize {
    match slot {
        SlotIndex::A => 0,
        SlotIndex::B => 1,
    }
}

impl LayerEngine<Ready> {
    /// The bound external tier.
    pub fn external(&self) -> &Arc<ExternalMemory> {
        self.external
            .as_ref()
            .expect("external tier exists in Ready state")
    }

    /// The bound local tier.
    pub fn local(&self) -> &Arc<LocalMemory> {
        self.local
            .as_ref()
            .expect("local tier exists in Ready state")
    }

    /// Executes the layer SPMD on `cluster`, overlapping `dma` transfers
    /// with `kernel` compute.
    ///
    /// Stateless across calls: each run starts from a fresh double-buffer
    /// state and walks the full tile loop.
    pub fn run(
        &self,
        kernel: &dyn ComputeKernel,
        dma: &dyn TransferEngine,
        cluster: &ThreadCluster,
    ) -> Result<RunReport, EngineError> {
        let start = Instant::now();
        let local = self
            .local
            .as_deref()
            .expect("local tier exists in Ready state");
        let orchestrator = DmaOrchestrator::new(&self.plan, &self.layout, &self.params, dma);

        tracing::debug!(
            iterations = self.plan.total_iterations(),
            units = cluster.units(),
            "layer run starting"
        );

        let results = cluster.run(|ctx| self.run_unit(ctx, kernel, dma, &orchestrator, local));

        let mut counters = None;
        for result in results {
            match result {
                Err(e) => return Err(e),
                Ok(Some(c)) => counters = Some(c),
                Ok(None) => {}
            }
        }
        let c = counters.expect("leader unit produced counters");

        let report = RunReport {
            iterations: self.plan.total_iterations(),
            units: cluster.units(),
            input_prefetches: c.input_prefetches,
            weight_reloads: c.weight_reloads,
            coeff_stagings: c.coeff_stagings,
            writebacks: c.writebacks,
            writeback_bytes: c.writeback_bytes,
            elapsed: start.elapsed(),
        };
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// One unit's traversal of the iteration state machine.
    fn run_unit(
        &self,
        ctx: &UnitCtx<'_>,
        kernel: &dyn ComputeKernel,
        dma: &dyn TransferEngine,
        orchestrator: &DmaOrchestrator<'_>,
        local: &LocalMemory,
    ) -> Result<Option<LeaderCounters>, EngineError> {
        let plan = &self.plan;
        let total = plan.total_iterations();
        let mut state = DoubleBufferState::new();
        let mut exec = plan.first_indices();
        let mut load = exec;
        let mut counters = LeaderCounters::default();
        // In-flight transfers; populated on the leader only.
        let mut pending_prefetch: Vec<TransferBatch> = Vec::new();
        let mut pending_writeback: [Option<TransferBatch>; 2] = [None, None];

        // Shared staging and the first tile, issued and waited by the
        // leader before the first barrier; the barrier publishes the
        // buffers to the other units.
        let first = plan.describe(exec);
        if ctx.is_leader() {
            let coeffs = orchestrator
                .stage_coefficients(&first, state.coeff().active())
                .expect(PREVALIDATED);
            let input = orchestrator
                .prefetch_input(&first, state.input().active())
                .expect(PREVALIDATED);
            let weights = orchestrator
                .prefetch_weights(&first, state.coeff().active())
                .expect(PREVALIDATED);
            counters.coeff_stagings += 1;
            counters.input_prefetches += 1;
            counters.weight_reloads += 1;
            coeffs.wait_all(dma).expect(PREVALIDATED);
            input.wait_all(dma).expect(PREVALIDATED);
            weights.wait_all(dma).expect(PREVALIDATED);
        }
        visibility_fence();
        ctx.barrier();

        for iter in 0..total {
            let tile = plan.describe(exec);
            let last = iter + 1 == total;

            if ctx.is_leader() {
                // The output slot compute writes this iteration may have
                // a writeback still in flight from two iterations ago.
                if let Some(batch) = pending_writeback[slot_idx(state.output().active())].take() {
                    batch.wait_all(dma).expect(PREVALIDATED);
                }
            }

            // PrefetchIssued: fill the prefetch slots for the next tile.
            let mut coeff_reload = false;
            if !last {
                load = plan.advance(load).expect("iterations remain");
                let next = plan.describe(load);
                coeff_reload = load.reloads_coefficients(&exec);
                if ctx.is_leader() {
                    pending_prefetch.push(
                        orchestrator
                            .prefetch_input(&next, state.input().prefetch())
                            .expect(PREVALIDATED),
                    );
                    counters.input_prefetches += 1;
                    if coeff_reload {
                        pending_prefetch.push(
                            orchestrator
                                .prefetch_weights(&next, state.coeff().prefetch())
                                .expect(PREVALIDATED),
                        );
                        pending_prefetch.push(
                            orchestrator
                                .stage_coefficients(&next, state.coeff().prefetch())
                                .expect(PREVALIDATED),
                        );
                        counters.weight_reloads += 1;
                        counters.coeff_stagings += 1;
                    }
                }
                // The prefetched data is read on the far side of a
                // barrier.
                visibility_fence();
            }

            // Barrier1: previous compute retired, slot swaps visible.
            ctx.barrier();
            // About to read buffers that crossed the barrier.
            visibility_fence();

            // Compute on the active buffers — the tile prefetched during
            // the previous iteration.
            invoker::invoke(
                kernel,
                local,
                &self.layout,
                plan,
                &self.params,
                &tile,
                &state,
                UnitInfo {
                    id: ctx.id(),
                    count: ctx.units(),
                },
            )?;

            // Barrier2: compute retired before writeback and swap.
            ctx.barrier();

            if ctx.is_leader() {
                // Confirm this iteration's prefetches before their slots
                // become active at Advance; the end-of-iteration barrier
                // then publishes them for the next compute.
                for batch in pending_prefetch.drain(..) {
                    batch.wait_all(dma).expect(PREVALIDATED);
                }
            }

            // WritebackIssued: the tile completed its input-channel
            // revolution, so its output is final.
            let output_complete = exec.in_group + 1 == plan.in_group_count();
            if output_complete && ctx.is_leader() {
                let slot = state.output().active();
                let batch = orchestrator.writeback(&tile, slot).expect(PREVALIDATED);
                pending_writeback[slot_idx(slot)] = Some(batch);
                counters.writebacks += 1;
                counters.writeback_bytes.push(tile.bytes.output);
            }

            // Advance: the single state-transition point.
            state.advance(coeff_reload, output_complete);
            exec = load;
            ctx.barrier();
        }

        // Terminal wait: no tile's output may be lost when the loop ends.
        if ctx.is_leader() {
            for batch in pending_writeback.iter_mut().filter_map(Option::take) {
                batch.wait_all(dma).expect(PREVALIDATED);
            }
        }
        ctx.barrier();

        Ok(ctx.is_leader().then_some(counters))
    }
}

impl<S: EngineState> std::fmt::Debug for LayerEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerEngine")
            .field("state", &std::any::type_name::<S>())
            .field("iterations", &self.plan.total_iterations())
            .field("arena_bytes", &self.layout.total_bytes())
            .field("tiers_bound", &self.local.is_some())
            .finish()
    }
}
