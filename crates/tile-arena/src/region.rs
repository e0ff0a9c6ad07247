// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor roles, buffer slots, and layout requests.

use std::fmt;

/// The tensor role a local-memory region is dedicated to.
///
/// Each role is double-buffered: the engine consumes one slot while the
/// transfer engine fills the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorRole {
    /// Input activation tile.
    Input,
    /// Weight tile for the current channel group.
    Weight,
    /// Per-channel quantization multipliers.
    Scale,
    /// Per-channel quantization biases.
    Bias,
    /// Output activation tile.
    Output,
}

impl TensorRole {
    /// All double-buffered roles, in arena placement order.
    ///
    /// The order matches the generated layers this crate was modelled on:
    /// activations first, then weights, then the quantization vectors.
    pub const ALL: [TensorRole; 5] = [
        TensorRole::Input,
        TensorRole::Output,
        TensorRole::Weight,
        TensorRole::Scale,
        TensorRole::Bias,
    ];

    /// Returns a short lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TensorRole::Input => "input",
            TensorRole::Weight => "weight",
            TensorRole::Scale => "scale",
            TensorRole::Bias => "bias",
            TensorRole::Output => "output",
        }
    }
}

impl fmt::Display for TensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one of the two slots backing a double-buffered role.
///
/// The arena only knows the two slots exist; which one is *active* versus
/// the *prefetch target* at any instant is runtime state owned by the
/// execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SlotIndex {
    A,
    B,
}

impl SlotIndex {
    /// Returns the other slot of the pair.
    pub fn other(self) -> SlotIndex {
        match self {
            SlotIndex::A => SlotIndex::B,
            SlotIndex::B => SlotIndex::A,
        }
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotIndex::A => f.write_str("A"),
            SlotIndex::B => f.write_str("B"),
        }
    }
}

/// One fixed region inside the local tier backing half of a double buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BufferSlot {
    /// The tensor role this slot serves.
    pub role: TensorRole,
    /// Which half of the double buffer this is.
    pub index: SlotIndex,
    /// Byte offset from the start of local memory.
    pub offset: usize,
    /// Region size in bytes (worst case over all tiles).
    pub size: usize,
}

impl BufferSlot {
    /// Returns the exclusive end offset of this region.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    /// Returns `true` if this slot's byte range overlaps `other`'s.
    pub fn overlaps(&self, other: &BufferSlot) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// A single-buffered scratch region (e.g. an im2col staging area).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScratchSlot {
    /// Region name, unique within the layout.
    pub name: String,
    /// Byte offset from the start of local memory.
    pub offset: usize,
    /// Region size in bytes.
    pub size: usize,
}

/// Worst-case byte sizes for every region the layer needs.
///
/// The double-buffered sizes must be the maximum over all tiles of the
/// layer — the arena reserves that much for *each* of the two slots.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegionRequest {
    /// Worst-case input tile size in bytes.
    pub input_bytes: usize,
    /// Worst-case weight tile size in bytes.
    pub weight_bytes: usize,
    /// Worst-case scale vector size in bytes.
    pub scale_bytes: usize,
    /// Worst-case bias vector size in bytes.
    pub bias_bytes: usize,
    /// Worst-case output tile size in bytes.
    pub output_bytes: usize,
    /// Named single-buffered scratch regions: `(name, bytes)`.
    pub scratch: Vec<(String, usize)>,
}

impl RegionRequest {
    /// Returns the worst-case size for a double-buffered role.
    pub fn role_bytes(&self, role: TensorRole) -> usize {
        match role {
            TensorRole::Input => self.input_bytes,
            TensorRole::Weight => self.weight_bytes,
            TensorRole::Scale => self.scale_bytes,
            TensorRole::Bias => self.bias_bytes,
            TensorRole::Output => self.output_bytes,
        }
    }
}
