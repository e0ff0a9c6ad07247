// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference quantized depthwise convolution.
//!
//! Portable scalar implementation of the primitive the engine drives on
//! hardware: i8 input and weights, i32 accumulation, per-channel
//! batch-norm requantization, ReLU clamp to u8. One weight plane per
//! channel (depthwise: no reduction across channels).
//!
//! Work is split across the cluster by output row: every unit computes
//! all channels of its contiguous row chunk, so the units' written
//! ranges inside the output view are disjoint.

use crate::{coeff_at, requantize, requantize_mult, ComputeKernel, KernelArgs, KernelError};

/// The reference depthwise primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthwiseConv;

impl DepthwiseConv {
    pub fn new() -> Self {
        Self
    }

    fn validate(args: &KernelArgs<'_>) -> Result<(), KernelError> {
        if args.out_channels != args.channels {
            return Err(KernelError::ChannelMismatch {
                input: args.channels,
                output: args.out_channels,
            });
        }
        if args.unit.count == 0 || args.unit.id >= args.unit.count {
            return Err(KernelError::InvalidUnit {
                id: args.unit.id,
                count: args.unit.count,
            });
        }

        let expected_input = args.channels * args.in_h * args.in_w;
        if args.input.len() != expected_input {
            return Err(KernelError::ShapeMismatch {
                what: "input",
                expected: expected_input,
                actual: args.input.len(),
            });
        }
        let expected_weights = args.channels * args.kernel_h * args.kernel_w;
        if args.weights.len() != expected_weights {
            return Err(KernelError::ShapeMismatch {
                what: "weights",
                expected: expected_weights,
                actual: args.weights.len(),
            });
        }
        let expected_output = args.out_channels * args.out_h * args.out_w;
        if args.output.len() != expected_output {
            return Err(KernelError::ShapeMismatch {
                what: "output",
                expected: expected_output,
                actual: args.output.len(),
            });
        }
        if !args.scale.is_empty() {
            let expected_coeff = args.channels * 4;
            if args.scale.len() != expected_coeff {
                return Err(KernelError::ShapeMismatch {
                    what: "scale",
                    expected: expected_coeff,
                    actual: args.scale.len(),
                });
            }
            if args.bias.len() != expected_coeff {
                return Err(KernelError::ShapeMismatch {
                    what: "bias",
                    expected: expected_coeff,
                    actual: args.bias.len(),
                });
            }
        }
        Ok(())
    }
}

impl ComputeKernel for DepthwiseConv {
    fn name(&self) -> &str {
        "depthwise-conv"
    }

    fn run(&self, args: &KernelArgs<'_>) -> Result<(), KernelError> {
        Self::validate(args)?;

        let pad_t = if args.pad_top { args.pad as isize } else { 0 };
        let pad_l = if args.pad_left { args.pad as isize } else { 0 };
        let (row_start, row_end) = args.unit.row_range(args.out_h);

        for c in 0..args.channels {
            let in_plane = &args.input[c * args.in_h * args.in_w..(c + 1) * args.in_h * args.in_w];
            let w_plane = &args.weights
                [c * args.kernel_h * args.kernel_w..(c + 1) * args.kernel_h * args.kernel_w];
            let out_plane_base = c * args.out_h * args.out_w;

            for r in row_start..row_end {
                for q in 0..args.out_w {
                    let mut acc: i32 = 0;
                    for i in 0..args.kernel_h {
                        let ih = (r * args.stride + i) as isize - pad_t;
                        if ih < 0 || ih >= args.in_h as isize {
                            // Synthesized zero row: only reachable on a
                            // flagged edge, so it contributes nothing.
                            continue;
                        }
                        for j in 0..args.kernel_w {
                            let iw = (q * args.stride + j) as isize - pad_l;
                            if iw < 0 || iw >= args.in_w as isize {
                                continue;
                            }
                            let x = in_plane[ih as usize * args.in_w + iw as usize] as i8;
                            let w = w_plane[i * args.kernel_w + j] as i8;
                            acc += i32::from(x) * i32::from(w);
                        }
                    }
                    if let Some(bias_add) = args.bias_add {
                        acc += i32::from(bias_add[c] as i8);
                    }
                    let value = if args.scale.is_empty() {
                        requantize_mult(acc, args.out_mult, args.out_shift)
                    } else {
                        requantize(acc, coeff_at(args.scale, c), coeff_at(args.bias, c), args.out_shift)
                    };
                    args.output.set(out_plane_base + r * args.out_w + q, value);
                }
            }
        }
        Ok(())
    }
}
