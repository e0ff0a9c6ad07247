// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CLI subcommand implementations.

pub mod annotate;
pub mod plan;
pub mod run;

use layer_engine::LayerSpec;
use std::path::PathBuf;

/// Initialises tracing output based on `-v` repetition.
pub fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

/// Loads the spec at `path`, or the built-in sampled layer.
pub fn load_spec(path: Option<PathBuf>) -> anyhow::Result<LayerSpec> {
    match path {
        Some(p) => {
            tracing::debug!("loading layer spec from {}", p.display());
            Ok(LayerSpec::from_file(&p)?)
        }
        None => {
            tracing::debug!("no spec given, using the built-in sampled layer");
            Ok(LayerSpec::sampled())
        }
    }
}
