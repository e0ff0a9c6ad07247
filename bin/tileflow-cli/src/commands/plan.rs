// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `tileflow plan`: inspect a layer's tile plan and arena layout.

use std::path::PathBuf;

pub fn execute(spec_path: Option<PathBuf>) -> anyhow::Result<()> {
    let spec = super::load_spec(spec_path)?;
    let engine = spec.build_engine()?;
    let plan = engine.tile_plan();

    println!("tileflow plan");
    println!("  {}", plan.summary());
    println!("  {}", engine.layout().summary());
    println!();
    println!(
        "  {:<14} {:<12} {:<12} {:<10} {:>9} {:>9}",
        "tile (g,r,c)", "out (h*w)", "in (h*w)", "padding", "in B", "out B"
    );

    for indices in plan.iter() {
        let t = plan.describe(indices);
        let pad = format!(
            "{}{}{}{}",
            if t.padding.top { 'T' } else { '-' },
            if t.padding.bottom { 'B' } else { '-' },
            if t.padding.left { 'L' } else { '-' },
            if t.padding.right { 'R' } else { '-' },
        );
        println!(
            "  {:<14} {:<12} {:<12} {:<10} {:>9} {:>9}",
            format!("({},{},{})", indices.group, indices.row, indices.col),
            format!("{}x{}", t.out_h, t.out_w),
            format!("{}x{}", t.in_h, t.in_w),
            pad,
            t.bytes.input,
            t.bytes.output,
        );
    }

    let request = plan.region_request(spec.scratch_regions());
    println!();
    println!(
        "  worst case per slot: input {} B, weight {} B, output {} B",
        request.input_bytes, request.weight_bytes, request.output_bytes
    );
    Ok(())
}
