// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer specifications loaded from TOML files or built programmatically.
//!
//! # TOML Format
//! ```toml
//! local_capacity = 65536
//! out_shift = 10
//! out_mult = 1
//!
//! [geometry]
//! in_h = 16
//! in_w = 16
//! channels = 256
//! kernel_h = 3
//! kernel_w = 3
//! stride = 1
//! pad = 1
//!
//! [tile]
//! out_tile_h = 16
//! out_tile_w = 16
//! channel_group = 32
//! ```

use crate::{EngineError, ExternalPlacement, LayerEngine, LayerParameters, Planned};
use std::path::Path;
use tile_planner::{ConvGeometry, TileSpec};

fn default_capacity() -> usize {
    64 * 1024
}

fn default_mult() -> u16 {
    1
}

/// A complete layer description, as the code generator would emit it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LayerSpec {
    /// The layer shape.
    pub geometry: ConvGeometry,
    /// The chosen tile size.
    pub tile: TileSpec,
    /// Local (fast) memory capacity in bytes.
    #[serde(default = "default_capacity")]
    pub local_capacity: usize,
    /// Requantization right-shift.
    #[serde(default)]
    pub out_shift: u8,
    /// Requantization multiplier for the non-batch-norm path.
    #[serde(default = "default_mult")]
    pub out_mult: u16,
    /// Im2col scratch bytes; defaults to the reference primitive's need.
    #[serde(default)]
    pub scratch_im2col: Option<usize>,
    /// Weight-repack scratch bytes.
    #[serde(default)]
    pub scratch_repack: Option<usize>,
}

impl LayerSpec {
    /// The depthwise layer the engine was modelled on: 16×16×256, 3×3
    /// kernel, tiles of 16×16×32 — eight iterations, one per channel
    /// group.
    pub fn sampled() -> Self {
        Self {
            geometry: ConvGeometry {
                in_h: 16,
                in_w: 16,
                channels: 256,
                kernel_h: 3,
                kernel_w: 3,
                stride: 1,
                pad: 1,
            },
            tile: TileSpec {
                out_tile_h: 16,
                out_tile_w: 16,
                channel_group: 32,
            },
            local_capacity: 64 * 1024,
            out_shift: 10,
            out_mult: 1,
            scratch_im2col: None,
            scratch_repack: None,
        }
    }

    /// Loads a spec from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("cannot read spec '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses a spec from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str)
            .map_err(|e| EngineError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises the spec to TOML.
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// The scratch regions the kernel invoker exposes.
    ///
    /// Defaults are sized for the reference primitive's worst case: one
    /// im2col row set and one repacked weight plane per channel of a
    /// group.
    pub fn scratch_regions(&self) -> Vec<(String, usize)> {
        let g = &self.geometry;
        let im2col = self
            .scratch_im2col
            .unwrap_or((g.kernel_h * g.kernel_w + 1) * self.tile.channel_group);
        let repack = self.scratch_repack.unwrap_or(self.tile.channel_group * 4);
        vec![("im2col".into(), im2col), ("repack".into(), repack)]
    }

    /// The dense external-tier placement for this layer.
    pub fn placement(&self) -> ExternalPlacement {
        ExternalPlacement::contiguous(&self.geometry)
    }

    /// Plans an engine for this spec.
    pub fn build_engine(&self) -> Result<LayerEngine<Planned>, EngineError> {
        let params = LayerParameters {
            placement: self.placement(),
            out_shift: self.out_shift,
            out_mult: self.out_mult,
        };
        LayerEngine::plan(
            self.geometry,
            self.tile,
            params,
            self.local_capacity,
            self.scratch_regions(),
        )
    }
}
