// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `tileflow run`: execute a layer end-to-end on the host backends.
//!
//! Stages synthetic tensors into the external tier, runs the tiled
//! engine on a thread cluster, and optionally re-runs the reference
//! primitive untiled to verify the stitched output.

use anyhow::Context;
use cluster_sync::ThreadCluster;
use conv_kernels::{ComputeKernel, DepthwiseConv, KernelArgs, TileView, UnitInfo};
use dma_engine::{ExternalMemory, HostDma, LocalMemory};
use layer_engine::LayerSpec;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;

pub fn execute(
    spec_path: Option<PathBuf>,
    units: usize,
    seed: u64,
    verify: bool,
) -> anyhow::Result<()> {
    let spec = super::load_spec(spec_path)?;
    let g = spec.geometry;

    println!("tileflow run");
    println!("  geometry: {}x{}x{} k{}x{} s{} p{}", g.in_h, g.in_w, g.channels, g.kernel_h, g.kernel_w, g.stride, g.pad);
    println!("  units:    {units}");
    println!();

    // ── Stage tensors ──────────────────────────────────────────
    let placement = spec.placement();
    let ext = Arc::new(ExternalMemory::new(placement.total_bytes));
    let staged = stage_tensors(&spec, &ext, seed);

    // ── Plan → Prepare → Run ───────────────────────────────────
    let planned = spec.build_engine()?;
    println!("  {}", planned.tile_plan().summary());
    println!("  {}", planned.layout().summary());
    println!();

    let local = Arc::new(LocalMemory::new(planned.layout().total_bytes()));
    let engine = planned.prepare(Arc::clone(&ext), Arc::clone(&local))?;
    let dma = HostDma::new(Arc::clone(&ext), local);
    let cluster = ThreadCluster::new(units).context("building cluster")?;

    let report = engine.run(&DepthwiseConv::new(), &dma, &cluster)?;
    println!("  {}", report.summary());
    println!("  {}", dma.stats().summary());

    // ── Verification ───────────────────────────────────────────
    if verify {
        let got = ext.read(placement.output, g.output_bytes());
        let want = reference_output(&spec, &staged);
        let mismatches = got
            .iter()
            .zip(&want)
            .filter(|(a, b)| a != b)
            .count();
        if mismatches == 0 {
            println!("  verify:   OK ({} bytes match untiled reference)", got.len());
        } else {
            anyhow::bail!("tiled output diverges from reference in {mismatches} bytes");
        }
    }

    Ok(())
}

/// The staged tensors, kept for the reference pass.
pub(crate) struct StagedTensors {
    pub input_hwc: Vec<u8>,
    pub weights: Vec<u8>,
    pub scale: Vec<u8>,
    pub bias: Vec<u8>,
}

/// Fills the external tier with seeded synthetic tensors.
pub(crate) fn stage_tensors(spec: &LayerSpec, ext: &ExternalMemory, seed: u64) -> StagedTensors {
    let g = &spec.geometry;
    let placement = spec.placement();
    let mut rng = StdRng::seed_from_u64(seed);

    let input_hwc: Vec<u8> = (0..g.input_bytes()).map(|_| rng.gen_range(0u8..16)).collect();
    let weights: Vec<u8> = (0..g.weight_bytes())
        .map(|_| rng.gen_range(-2i8..=2) as u8)
        .collect();
    let scale: Vec<u8> = (0..g.channels)
        .flat_map(|_| rng.gen_range(1i32..4).to_le_bytes())
        .collect();
    let bias: Vec<u8> = (0..g.channels)
        .flat_map(|_| rng.gen_range(-8i32..8).to_le_bytes())
        .collect();

    ext.write(placement.input, &input_hwc);
    ext.write(placement.weights, &weights);
    ext.write(placement.scale, &scale);
    ext.write(placement.bias, &bias);

    StagedTensors {
        input_hwc,
        weights,
        scale,
        bias,
    }
}

/// Runs the reference primitive once on the untiled tensors and returns
/// the interleaved output.
pub(crate) fn reference_output(spec: &LayerSpec, staged: &StagedTensors) -> Vec<u8> {
    let g = &spec.geometry;

    // Interleaved → channel-planar.
    let mut input_chw = vec![0u8; staged.input_hwc.len()];
    for r in 0..g.in_h {
        for q in 0..g.in_w {
            for c in 0..g.channels {
                input_chw[c * g.in_h * g.in_w + r * g.in_w + q] =
                    staged.input_hwc[(r * g.in_w + q) * g.channels + c];
            }
        }
    }

    let mut out_chw = vec![0u8; g.output_bytes()];
    // Safety: exclusive access to `out_chw` for the view's lifetime.
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
    DepthwiseConv::new()
        .run(&args)
        .expect("reference invocation over validated buffers");
    drop(view);

    // Channel-planar → interleaved, matching the external tier.
    let (out_h, out_w) = (g.out_h(), g.out_w());
    let mut out_hwc = vec![0u8; out_chw.len()];
    for r in 0..out_h {
        for q in 0..out_w {
            for c in 0..g.channels {
                out_hwc[(r * out_w + q) * g.channels + c] =
                    out_chw[c * out_h * out_w + r * out_w + q];
            }
        }
    }
    out_hwc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_sampled_layer_verifies() {
        // The full CLI path minus argument parsing.
        let spec = LayerSpec::sampled();
        let placement = spec.placement();
        let ext = Arc::new(ExternalMemory::new(placement.total_bytes));
        let staged = stage_tensors(&spec, &ext, 7);

        let planned = spec.build_engine().unwrap();
        let local = Arc::new(LocalMemory::new(planned.layout().total_bytes()));
        let engine = planned.prepare(Arc::clone(&ext), Arc::clone(&local)).unwrap();
        let dma = HostDma::new(Arc::clone(&ext), local);
        let cluster = ThreadCluster::new(2).unwrap();
        engine.run(&DepthwiseConv::new(), &dma, &cluster).unwrap();

        let got = ext.read(placement.output, spec.geometry.output_bytes());
        assert_eq!(got, reference_output(&spec, &staged));
    }
}
