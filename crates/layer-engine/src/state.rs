// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Double-buffer state: which slot of each role is active.

use tile_arena::SlotIndex;

/// The active/prefetch designation for one double-buffered role.
///
/// At any instant exactly one slot is *active* (consumed by this
/// iteration's compute) and the other is the *prefetch target* (filled
/// for the next iteration). The designation flips only through
/// [`SlotToggle::swap`], which the scheduler calls at the `Advance`
/// point — never inline at a use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotToggle {
    active: SlotIndex,
}

impl SlotToggle {
    fn new() -> Self {
        Self {
            active: SlotIndex::A,
        }
    }

    /// The slot compute consumes this iteration.
    pub fn active(&self) -> SlotIndex {
        self.active
    }

    /// The slot transfers fill for the next iteration.
    pub fn prefetch(&self) -> SlotIndex {
        self.active.other()
    }

    fn swap(&mut self) {
        self.active = self.active.other();
    }
}

/// Per-role double-buffer state for one layer run.
///
/// The weight tile and the quantization scale/bias vectors share one
/// toggle: they reload together, on the same channel-group condition, so
/// their designations can never diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleBufferState {
    input: SlotToggle,
    coeff: SlotToggle,
    output: SlotToggle,
}

impl DoubleBufferState {
    /// Initial state: slot A active for every role, matching the
    /// pre-loop transfers that fill slot A.
    pub fn new() -> Self {
        Self {
            input: SlotToggle::new(),
            coeff: SlotToggle::new(),
            output: SlotToggle::new(),
        }
    }

    /// The input role's toggle.
    pub fn input(&self) -> &SlotToggle {
        &self.input
    }

    /// The shared weight/scale/bias toggle.
    pub fn coeff(&self) -> &SlotToggle {
        &self.coeff
    }

    /// The output role's toggle.
    pub fn output(&self) -> &SlotToggle {
        &self.output
    }

    /// The single state-transition point, invoked at `Advance`.
    ///
    /// The input designation flips every iteration; the coefficient
    /// designation flips only when this iteration issued a reload; the
    /// output designation flips when the iteration completed an output
    /// tile (its input-channel revolution wrapped).
    pub fn advance(&mut self, coeff_reloaded: bool, output_complete: bool) {
        self.input.swap();
        if coeff_reloaded {
            self.coeff.swap();
        }
        if output_complete {
            self.output.swap();
        }
    }
}

impl Default for DoubleBufferState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let s = DoubleBufferState::new();
        assert_eq!(s.input().active(), SlotIndex::A);
        assert_eq!(s.input().prefetch(), SlotIndex::B);
        assert_eq!(s.coeff().active(), SlotIndex::A);
        assert_eq!(s.output().active(), SlotIndex::A);
    }

    #[test]
    fn test_active_and_prefetch_never_alias() {
        let mut s = DoubleBufferState::new();
        for i in 0..8 {
            assert_ne!(s.input().active(), s.input().prefetch());
            assert_ne!(s.coeff().active(), s.coeff().prefetch());
            assert_ne!(s.output().active(), s.output().prefetch());
            s.advance(i % 3 == 0, true);
        }
    }

    #[test]
    fn test_input_flips_every_advance() {
        let mut s = DoubleBufferState::new();
        s.advance(false, false);
        assert_eq!(s.input().active(), SlotIndex::B);
        s.advance(false, false);
        assert_eq!(s.input().active(), SlotIndex::A);
    }

    #[test]
    fn test_coeff_flips_only_on_reload() {
        let mut s = DoubleBufferState::new();
        s.advance(false, true);
        assert_eq!(s.coeff().active(), SlotIndex::A);
        s.advance(true, true);
        assert_eq!(s.coeff().active(), SlotIndex::B);
        s.advance(false, true);
        assert_eq!(s.coeff().active(), SlotIndex::B);
    }

    #[test]
    fn test_output_flips_on_completion() {
        let mut s = DoubleBufferState::new();
        s.advance(false, false);
        assert_eq!(s.output().active(), SlotIndex::A);
        s.advance(false, true);
        assert_eq!(s.output().active(), SlotIndex::B);
    }
}
