// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The tile plan: a validated iteration space over one layer.

use crate::{ConvGeometry, Padding, PlanError, TileBytes, TileDescriptor, TileIndices};
use tile_arena::RegionRequest;

/// The chosen tile size per axis.
///
/// Output-relative: a tile covers `out_tile_h × out_tile_w` output
/// elements of `channel_group` channels. The matching input window
/// (larger by the kernel halo, clipped at tensor edges) is derived by the
/// plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileSpec {
    /// Output rows per tile.
    pub out_tile_h: usize,
    /// Output columns per tile.
    pub out_tile_w: usize,
    /// Channels per group.
    pub channel_group: usize,
}

/// The validated iteration space for one layer.
///
/// Axis counts are fixed at construction; remainder tiles (a trailing
/// tile smaller than the requested size) are supported on every axis, so
/// tile counts need not divide the tensor evenly.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct TilePlan {
    geometry: ConvGeometry,
    spec: TileSpec,
    group_count: usize,
    h_count: usize,
    w_count: usize,
    in_group_count: usize,
}

fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Extent of tile `index` on an axis of `total` elements cut into
/// `count` tiles of nominal size `tile`: full tiles everywhere except a
/// possibly smaller trailing remainder.
fn axis_extent(index: usize, count: usize, total: usize, tile: usize) -> usize {
    if index + 1 == count {
        total - tile * (count - 1)
    } else {
        tile
    }
}

impl TilePlan {
    /// Builds a plan for `geometry` cut into `spec`-sized tiles.
    pub fn new(geometry: ConvGeometry, spec: TileSpec) -> Result<TilePlan, PlanError> {
        geometry.validate()?;
        if spec.out_tile_h == 0 || spec.out_tile_w == 0 || spec.channel_group == 0 {
            return Err(PlanError::ZeroDimension("tile"));
        }
        let out_h = geometry.out_h();
        let out_w = geometry.out_w();
        if spec.out_tile_h > out_h {
            return Err(PlanError::TileTooLarge {
                axis: "row",
                tile: spec.out_tile_h,
                total: out_h,
            });
        }
        if spec.out_tile_w > out_w {
            return Err(PlanError::TileTooLarge {
                axis: "column",
                tile: spec.out_tile_w,
                total: out_w,
            });
        }
        if spec.channel_group > geometry.channels {
            return Err(PlanError::TileTooLarge {
                axis: "channel",
                tile: spec.channel_group,
                total: geometry.channels,
            });
        }

        let plan = TilePlan {
            geometry,
            spec,
            group_count: ceil_div(geometry.channels, spec.channel_group),
            h_count: ceil_div(out_h, spec.out_tile_h),
            w_count: ceil_div(out_w, spec.out_tile_w),
            in_group_count: 1,
        };
        tracing::debug!("{}", plan.summary());
        Ok(plan)
    }

    /// Sets a real extent for the innermost input-channel revolution.
    ///
    /// Depthwise layers leave this at 1 (the input group is bound to the
    /// output group); channel-reducing layers visit `n` input groups per
    /// output tile before advancing spatially.
    pub fn with_input_groups(mut self, n: usize) -> Result<TilePlan, PlanError> {
        if n == 0 {
            return Err(PlanError::ZeroDimension("input-channel groups"));
        }
        self.in_group_count = n;
        Ok(self)
    }

    /// The layer geometry this plan cuts.
    pub fn geometry(&self) -> &ConvGeometry {
        &self.geometry
    }

    /// The requested tile size.
    pub fn spec(&self) -> &TileSpec {
        &self.spec
    }

    /// Number of output-channel groups.
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Number of row tiles.
    pub fn h_count(&self) -> usize {
        self.h_count
    }

    /// Number of column tiles.
    pub fn w_count(&self) -> usize {
        self.w_count
    }

    /// Number of input-channel groups per output tile.
    pub fn in_group_count(&self) -> usize {
        self.in_group_count
    }

    /// Total loop iterations to execute the layer.
    pub fn total_iterations(&self) -> usize {
        self.group_count * self.h_count * self.w_count * self.in_group_count
    }

    /// The first position of the loop nest.
    pub fn first_indices(&self) -> TileIndices {
        TileIndices::ZERO
    }

    /// Computes the full descriptor for the tile at `indices`.
    ///
    /// # Panics
    /// Panics if `indices` lies outside the iteration space; positions
    /// are only produced by this plan's own walker.
    pub fn describe(&self, indices: TileIndices) -> TileDescriptor {
        assert!(
            indices.group < self.group_count
                && indices.row < self.h_count
                && indices.col < self.w_count
                && indices.in_group < self.in_group_count,
            "tile indices {indices:?} outside plan"
        );
        let g = &self.geometry;

        let group_channels = axis_extent(
            indices.group,
            self.group_count,
            g.channels,
            self.spec.channel_group,
        );
        let channel_start = indices.group * self.spec.channel_group;

        let out_h = axis_extent(indices.row, self.h_count, g.out_h(), self.spec.out_tile_h);
        let out_w = axis_extent(indices.col, self.w_count, g.out_w(), self.spec.out_tile_w);
        let out_row_start = indices.row * self.spec.out_tile_h;
        let out_col_start = indices.col * self.spec.out_tile_w;

        let (in_row_start, in_h) = input_window(out_row_start, out_h, g.stride, g.kernel_h, g.pad, g.in_h);
        let (in_col_start, in_w) = input_window(out_col_start, out_w, g.stride, g.kernel_w, g.pad, g.in_w);

        let padding = Padding {
            top: indices.row == 0,
            bottom: indices.row + 1 == self.h_count,
            left: indices.col == 0,
            right: indices.col + 1 == self.w_count,
        };

        let bytes = TileBytes {
            input: in_h * in_w * group_channels,
            weight: group_channels * g.kernel_h * g.kernel_w,
            scale: group_channels * 4,
            bias: group_channels * 4,
            output: out_h * out_w * group_channels,
        };

        TileDescriptor {
            indices,
            group_channels,
            channel_start,
            out_h,
            out_w,
            out_row_start,
            out_col_start,
            in_h,
            in_w,
            in_row_start,
            in_col_start,
            padding,
            bytes,
        }
    }

    /// Worst-case region sizes over all tiles, for the arena.
    pub fn region_request(&self, scratch: Vec<(String, usize)>) -> RegionRequest {
        let mut request = RegionRequest {
            input_bytes: 0,
            weight_bytes: 0,
            scale_bytes: 0,
            bias_bytes: 0,
            output_bytes: 0,
            scratch,
        };
        for indices in self.iter() {
            let tile = self.describe(indices);
            request.input_bytes = request.input_bytes.max(tile.bytes.input);
            request.weight_bytes = request.weight_bytes.max(tile.bytes.weight);
            request.scale_bytes = request.scale_bytes.max(tile.bytes.scale);
            request.bias_bytes = request.bias_bytes.max(tile.bytes.bias);
            request.output_bytes = request.output_bytes.max(tile.bytes.output);
        }
        request
    }

    /// Returns a human-readable summary of the iteration space.
    pub fn summary(&self) -> String {
        format!(
            "Plan: {} channel groups x {}x{} spatial tiles x {} input groups = {} iterations, \
             tile {}x{}x{}",
            self.group_count,
            self.h_count,
            self.w_count,
            self.in_group_count,
            self.total_iterations(),
            self.spec.out_tile_h,
            self.spec.out_tile_w,
            self.spec.channel_group,
        )
    }
}

/// The input window (start, extent) for an output range on one spatial
/// axis: the halo-extended range clipped to the tensor. Clipped-away
/// rows are synthesized by the kernel on the edges whose padding flag is
/// set.
fn input_window(
    out_start: usize,
    out_extent: usize,
    stride: usize,
    kernel: usize,
    pad: usize,
    total: usize,
) -> (usize, usize) {
    let start = (out_start * stride) as isize - pad as isize;
    let end = ((out_start + out_extent - 1) * stride + kernel) as isize - pad as isize;
    let clipped_start = start.max(0) as usize;
    let clipped_end = (end.max(0) as usize).min(total);
    (clipped_start, clipped_end - clipped_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry_16() -> ConvGeometry {
        ConvGeometry {
            in_h: 16,
            in_w: 16,
            channels: 256,
            kernel_h: 3,
            kernel_w: 3,
            stride: 1,
            pad: 1,
        }
    }

    fn geometry_32() -> ConvGeometry {
        ConvGeometry {
            in_h: 32,
            in_w: 32,
            channels: 32,
            kernel_h: 3,
            kernel_w: 3,
            stride: 1,
            pad: 1,
        }
    }

    #[test]
    fn test_sampled_layer_plan() {
        // The generated layer this engine was modelled on: 16×16×256,
        // tiles of 16×16×32 → 8 iterations, one per channel group.
        let plan = TilePlan::new(
            geometry_16(),
            TileSpec {
                out_tile_h: 16,
                out_tile_w: 16,
                channel_group: 32,
            },
        )
        .unwrap();
        assert_eq!(plan.group_count(), 8);
        assert_eq!(plan.h_count(), 1);
        assert_eq!(plan.w_count(), 1);
        assert_eq!(plan.total_iterations(), 8);

        let tile = plan.describe(plan.first_indices());
        assert_eq!(tile.bytes.input, 8192);
        assert_eq!(tile.bytes.output, 8192);
        assert_eq!(tile.bytes.weight, 288);
        assert_eq!(tile.bytes.scale, 128);
        assert_eq!(tile.bytes.bias, 128);
        // Single spatial tile: first and last coincide, all edges padded.
        assert_eq!(
            tile.padding,
            Padding {
                top: true,
                bottom: true,
                left: true,
                right: true
            }
        );
    }

    #[test]
    fn test_padding_flags_only_on_boundary_tiles() {
        let plan = TilePlan::new(
            geometry_32(),
            TileSpec {
                out_tile_h: 8,
                out_tile_w: 8,
                channel_group: 32,
            },
        )
        .unwrap();
        for indices in plan.iter() {
            let tile = plan.describe(indices);
            assert_eq!(tile.padding.top, indices.row == 0);
            assert_eq!(tile.padding.bottom, indices.row == plan.h_count() - 1);
            assert_eq!(tile.padding.left, indices.col == 0);
            assert_eq!(tile.padding.right, indices.col == plan.w_count() - 1);
            if indices.row > 0
                && indices.row < plan.h_count() - 1
                && indices.col > 0
                && indices.col < plan.w_count() - 1
            {
                assert!(!tile.padding.any(), "interior tile padded: {tile:?}");
            }
        }
    }

    #[test]
    fn test_output_tiles_partition_tensor() {
        // No gaps, no overlaps: every output element covered exactly once.
        let plan = TilePlan::new(
            geometry_32(),
            TileSpec {
                out_tile_h: 12, // uneven: 32 = 12 + 12 + 8
                out_tile_w: 16,
                channel_group: 12, // uneven: 32 = 12 + 12 + 8
            },
        )
        .unwrap();
        let g = plan.geometry();
        let mut covered = vec![0u8; g.out_h() * g.out_w() * g.channels];
        for indices in plan.iter() {
            let t = plan.describe(indices);
            for r in t.out_row_start..t.out_row_start + t.out_h {
                for c in t.out_col_start..t.out_col_start + t.out_w {
                    for ch in t.channel_start..t.channel_start + t.group_channels {
                        covered[(r * g.out_w() + c) * g.channels + ch] += 1;
                    }
                }
            }
        }
        assert!(covered.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_input_windows_cover_tensor() {
        // Halo windows overlap, but every input element must be covered.
        let plan = TilePlan::new(
            geometry_32(),
            TileSpec {
                out_tile_h: 8,
                out_tile_w: 8,
                channel_group: 16,
            },
        )
        .unwrap();
        let g = plan.geometry();
        let mut covered = vec![false; g.in_h * g.in_w * g.channels];
        for indices in plan.iter() {
            let t = plan.describe(indices);
            for r in t.in_row_start..t.in_row_start + t.in_h {
                for c in t.in_col_start..t.in_col_start + t.in_w {
                    for ch in t.channel_start..t.channel_start + t.group_channels {
                        covered[(r * g.in_w + c) * g.channels + ch] = true;
                    }
                }
            }
        }
        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn test_halo_extent() {
        // 2×2 spatial grid over 32×32: first tile loses one halo row to
        // padding, interior side gains one; both windows are 17 rows.
        let plan = TilePlan::new(
            geometry_32(),
            TileSpec {
                out_tile_h: 16,
                out_tile_w: 16,
                channel_group: 32,
            },
        )
        .unwrap();
        let first = plan.describe(TileIndices::ZERO);
        assert_eq!(first.in_row_start, 0);
        assert_eq!(first.in_h, 17);

        let second = plan.describe(TileIndices {
            row: 1,
            ..TileIndices::ZERO
        });
        assert_eq!(second.in_row_start, 15);
        assert_eq!(second.in_h, 17);
    }

    #[test]
    fn test_remainder_extents() {
        let g = ConvGeometry {
            in_h: 20,
            in_w: 20,
            channels: 10,
            kernel_h: 3,
            kernel_w: 3,
            stride: 1,
            pad: 1,
        };
        let plan = TilePlan::new(
            g,
            TileSpec {
                out_tile_h: 16,
                out_tile_w: 16,
                channel_group: 4,
            },
        )
        .unwrap();
        assert_eq!(plan.h_count(), 2);
        assert_eq!(plan.group_count(), 3);

        let last = plan.describe(TileIndices {
            group: 2,
            row: 1,
            col: 1,
            in_group: 0,
        });
        assert_eq!(last.out_h, 4);
        assert_eq!(last.out_w, 4);
        assert_eq!(last.group_channels, 2);
    }

    #[test]
    fn test_region_request_covers_every_tile() {
        let plan = TilePlan::new(
            geometry_32(),
            TileSpec {
                out_tile_h: 12,
                out_tile_w: 12,
                channel_group: 12,
            },
        )
        .unwrap();
        let request = plan.region_request(vec![]);
        for indices in plan.iter() {
            let t = plan.describe(indices);
            assert!(t.bytes.input <= request.input_bytes);
            assert!(t.bytes.weight <= request.weight_bytes);
            assert!(t.bytes.output <= request.output_bytes);
        }
    }

    #[test]
    fn test_tile_too_large() {
        let result = TilePlan::new(
            geometry_16(),
            TileSpec {
                out_tile_h: 64,
                out_tile_w: 16,
                channel_group: 32,
            },
        );
        assert!(matches!(result, Err(PlanError::TileTooLarge { .. })));
    }

    #[test]
    fn test_input_groups_multiply_iterations() {
        let plan = TilePlan::new(
            geometry_16(),
            TileSpec {
                out_tile_h: 16,
                out_tile_w: 16,
                channel_group: 32,
            },
        )
        .unwrap()
        .with_input_groups(4)
        .unwrap();
        assert_eq!(plan.total_iterations(), 32);
    }
}
