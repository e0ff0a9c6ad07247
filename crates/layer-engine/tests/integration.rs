// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: full tiled layer runs on the host backends.
//!
//! The end-to-end property: stitching together all output tiles produced
//! over a run reconstructs the tensor obtained by running the same
//! primitive once on the untiled tensor with equivalent padding. Plus the
//! transfer-scheduling invariants of the loop (reload conditions,
//! writeback counts, drained handles).

use cluster_sync::ThreadCluster;
use conv_kernels::{DepthwiseConv, KernelArgs, TileView, UnitInfo};
use dma_engine::{ExternalMemory, HostDma, LocalMemory};
use layer_engine::{EngineError, LayerEngine, LayerSpec, Ready, RunReport};
use std::sync::Arc;
use tile_planner::{ConvGeometry, TileSpec};

// ── Helpers ────────────────────────────────────────────────────

/// Deterministic byte stream for staging tensors.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self, modulus: u8) -> u8 {
        self.0 = self.0.wrapping_mul(1103515245).wrapping_add(12345);
        ((self.0 >> 16) as u8) % modulus
    }
}

/// The staged external tensors of one layer, kept for the reference run.
struct StagedLayer {
    input_hwc: Vec<u8>,
    weights: Vec<u8>,
    scale: Vec<u8>,
    bias: Vec<u8>,
}

/// Fills the external tier with deterministic input/weights/coefficients.
fn stage(spec: &LayerSpec, ext: &ExternalMemory) -> StagedLayer {
    let g = &spec.geometry;
    let placement = spec.placement();
    let mut rng = Lcg(0x5eed);

    // Small magnitudes keep the accumulator well inside the u8 output
    // range after requantization, so every element is discriminating.
    let input_hwc: Vec<u8> = (0..g.input_bytes()).map(|_| rng.next(16)).collect();
    let weights: Vec<u8> = (0..g.weight_bytes())
        .map(|_| (rng.next(5) as i8 - 2) as u8)
        .collect();
    let scale: Vec<u8> = (0..g.channels)
        .flat_map(|c| (1 + (c as i32 % 3)).to_le_bytes())
        .collect();
    let bias: Vec<u8> = (0..g.channels)
        .flat_map(|c| ((c as i32 % 5) - 2).to_le_bytes())
        .collect();

    ext.write(placement.input, &input_hwc);
    ext.write(placement.weights, &weights);
    ext.write(placement.scale, &scale);
    ext.write(placement.bias, &bias);

    StagedLayer {
        input_hwc,
        weights,
        scale,
        bias,
    }
}

fn hwc_to_chw(bytes: &[u8], h: usize, w: usize, c: usize) -> Vec<u8> {
    let mut out = vec![0u8; bytes.len()];
    for r in 0..h {
        for q in 0..w {
            for ch in 0..c {
                out[ch * h * w + r * w + q] = bytes[(r * w + q) * c + ch];
            }
        }
    }
    out
}

fn chw_to_hwc(bytes: &[u8], h: usize, w: usize, c: usize) -> Vec<u8> {
    let mut out = vec![0u8; bytes.len()];
    for r in 0..h {
        for q in 0..w {
            for ch in 0..c {
                out[(r * w + q) * c + ch] = bytes[ch * h * w + r * w + q];
            }
        }
    }
    out
}

/// Runs the reference primitive once on the untiled tensor, all edges
/// padded, and returns the output interleaved like the external tier.
fn reference_output(spec: &LayerSpec, staged: &StagedLayer) -> Vec<u8> {
    let g = &spec.geometry;
    let input_chw = hwc_to_chw(&staged.input_hwc, g.in_h, g.in_w, g.channels);
    let mut out_chw = vec![0u8; g.output_bytes()];
    let view = unsafe { TileView::new(out_chw.as_mut_ptr(), out_chw.len()) };
    let args = KernelArgs {
        input: &input_chw,
        in_h: g.in_h,
        in_w: g.in_w,
        channels: g.channels,
        weights: &staged.weights,
        out_channels: g.channels,
        kernel_h: g.kernel_h,
        kernel_w: g.kernel_w,
        pad_top: true,
        pad_bottom: true,
        pad_left: true,
        pad_right: true,
        pad: g.pad,
        stride: g.stride,
        bias_add: None,
        out_shift: spec.out_shift,
        out_mult: spec.out_mult,
        output: &view,
        out_h: g.out_h(),
        out_w: g.out_w(),
        scale: &staged.scale,
        bias: &staged.bias,
        im2col: None,
        repack: None,
        dma_event: None,
        unit: UnitInfo::SOLO,
    };
    conv_kernels::ComputeKernel::run(&DepthwiseConv::new(), &args).unwrap();
    drop(view);
    chw_to_hwc(&out_chw, g.out_h(), g.out_w(), g.channels)
}

struct Harness {
    spec: LayerSpec,
    engine: LayerEngine<Ready>,
    ext: Arc<ExternalMemory>,
    dma: HostDma,
    staged: StagedLayer,
}

fn harness(spec: LayerSpec) -> Harness {
    let ext = Arc::new(ExternalMemory::new(spec.placement().total_bytes));
    let staged = stage(&spec, &ext);
    let planned = spec.build_engine().unwrap();
    let local = Arc::new(LocalMemory::new(planned.layout().total_bytes()));
    let engine = planned
        .prepare(Arc::clone(&ext), Arc::clone(&local))
        .unwrap();
    let dma = HostDma::new(Arc::clone(&ext), local);
    Harness {
        spec,
        engine,
        ext,
        dma,
        staged,
    }
}

impl Harness {
    fn run(&self, units: usize) -> RunReport {
        let cluster = ThreadCluster::new(units).unwrap();
        self.engine
            .run(&DepthwiseConv::new(), &self.dma, &cluster)
            .unwrap()
    }

    fn output(&self) -> Vec<u8> {
        let placement = self.spec.placement();
        self.ext
            .read(placement.output, self.spec.geometry.output_bytes())
    }
}

// ── The sampled-layer scenario ─────────────────────────────────

#[test]
fn test_sampled_layer_transfer_counts() {
    // 1×1 spatial × 8 channel groups of 32, tiles 16×16: every iteration
    // changes channel group, so exactly 8 weight/coefficient pairs and 8
    // writebacks of 8192 bytes are issued.
    let h = harness(LayerSpec::sampled());
    let report = h.run(4);

    assert_eq!(report.iterations, 8);
    assert_eq!(report.input_prefetches, 8);
    assert_eq!(report.weight_reloads, 8);
    assert_eq!(report.coeff_stagings, 8);
    assert_eq!(report.writebacks, 8);
    assert_eq!(report.writeback_bytes, vec![8192; 8]);
    assert_eq!(report.total_output_bytes(), 8 * 8192);
}

#[test]
fn test_all_handles_drained() {
    // Every issued transfer was waited on: nothing pending, waits match
    // issues.
    let h = harness(LayerSpec::sampled());
    h.run(2);

    assert_eq!(h.dma.pending(), 0);
    let stats = h.dma.stats();
    assert_eq!(stats.waits, stats.total_issued());
}

#[test]
fn test_sampled_layer_matches_reference() {
    let h = harness(LayerSpec::sampled());
    h.run(4);
    assert_eq!(h.output(), reference_output(&h.spec, &h.staged));
}

// ── End-to-end equality across grid shapes ─────────────────────

fn multi_tile_spec() -> LayerSpec {
    LayerSpec {
        geometry: ConvGeometry {
            in_h: 32,
            in_w: 32,
            channels: 8,
            kernel_h: 3,
            kernel_w: 3,
            stride: 1,
            pad: 1,
        },
        tile: TileSpec {
            out_tile_h: 16,
            out_tile_w: 16,
            channel_group: 4,
        },
        local_capacity: 64 * 1024,
        out_shift: 2,
        out_mult: 1,
        scratch_im2col: None,
        scratch_repack: None,
    }
}

#[test]
fn test_spatial_tiling_matches_reference() {
    // 2×2 spatial grid exercises the halo windows and per-edge padding.
    let h = harness(multi_tile_spec());
    h.run(1);
    assert_eq!(h.output(), reference_output(&h.spec, &h.staged));
}

#[test]
fn test_unit_count_does_not_change_results() {
    let solo = harness(multi_tile_spec());
    solo.run(1);
    let quad = harness(multi_tile_spec());
    quad.run(4);
    assert_eq!(solo.output(), quad.output());
}

#[test]
fn test_remainder_tiles_match_reference() {
    // 20×20 outputs over 16-wide tiles: trailing tiles are 4 wide; 10
    // channels over groups of 4: trailing group is 2 wide.
    let spec = LayerSpec {
        geometry: ConvGeometry {
            in_h: 20,
            in_w: 20,
            channels: 10,
            kernel_h: 3,
            kernel_w: 3,
            stride: 1,
            pad: 1,
        },
        tile: TileSpec {
            out_tile_h: 16,
            out_tile_w: 16,
            channel_group: 4,
        },
        ..multi_tile_spec()
    };
    let h = harness(spec);
    h.run(3);
    assert_eq!(h.output(), reference_output(&h.spec, &h.staged));
}

#[test]
fn test_strided_layer_matches_reference() {
    let spec = LayerSpec {
        geometry: ConvGeometry {
            in_h: 16,
            in_w: 16,
            channels: 4,
            kernel_h: 3,
            kernel_w: 3,
            stride: 2,
            pad: 1,
        },
        tile: TileSpec {
            out_tile_h: 4,
            out_tile_w: 4,
            channel_group: 2,
        },
        ..multi_tile_spec()
    };
    let h = harness(spec);
    h.run(2);
    assert_eq!(h.output(), reference_output(&h.spec, &h.staged));
}

// ── Transfer-scheduling invariants ─────────────────────────────

#[test]
fn test_weights_reused_across_spatial_tiles() {
    // 2 groups × 2×2 spatial tiles = 8 iterations, but only 2 distinct
    // channel groups: consecutive iterations sharing a group issue zero
    // weight/coefficient transfers.
    let h = harness(multi_tile_spec());
    let report = h.run(2);

    assert_eq!(report.iterations, 8);
    assert_eq!(report.input_prefetches, 8);
    assert_eq!(report.weight_reloads, 2);
    assert_eq!(report.coeff_stagings, 2);
    assert_eq!(report.writebacks, 8);
}

#[test]
fn test_writeback_volume_equals_output_tensor() {
    let h = harness(multi_tile_spec());
    let report = h.run(2);
    assert_eq!(
        report.total_output_bytes(),
        h.spec.geometry.output_bytes()
    );
    let stats = h.dma.stats();
    assert_eq!(stats.bytes_out as usize, h.spec.geometry.output_bytes());
}

#[test]
fn test_engine_is_stateless_between_runs() {
    let h = harness(multi_tile_spec());
    let first_report = h.run(2);
    let first_output = h.output();

    let second_report = h.run(2);
    assert_eq!(h.output(), first_output);
    assert_eq!(second_report.writebacks, first_report.writebacks);
    assert_eq!(second_report.weight_reloads, first_report.weight_reloads);
}

// ── Generation-time failures ───────────────────────────────────

#[test]
fn test_arena_overflow_fails_at_plan_time() {
    let spec = LayerSpec {
        local_capacity: 4 * 1024, // far too small for 2×8 KB slots
        ..LayerSpec::sampled()
    };
    assert!(matches!(
        spec.build_engine(),
        Err(EngineError::ArenaError(
            tile_arena::ArenaError::CapacityExceeded { .. }
        ))
    ));
}

#[test]
fn test_undersized_external_tier_rejected_at_prepare() {
    let spec = LayerSpec::sampled();
    let planned = spec.build_engine().unwrap();
    let ext = Arc::new(ExternalMemory::new(128)); // absurdly small
    let local = Arc::new(LocalMemory::new(planned.layout().total_bytes()));
    assert!(matches!(
        planned.prepare(ext, local),
        Err(EngineError::TierTooSmall {
            tier: "external",
            ..
        })
    ));
}

#[test]
fn test_undersized_local_tier_rejected_at_prepare() {
    let spec = LayerSpec::sampled();
    let planned = spec.build_engine().unwrap();
    let ext = Arc::new(ExternalMemory::new(spec.placement().total_bytes));
    let local = Arc::new(LocalMemory::new(1024));
    assert!(matches!(
        planned.prepare(ext, local),
        Err(EngineError::TierTooSmall { tier: "local", .. })
    ));
}
