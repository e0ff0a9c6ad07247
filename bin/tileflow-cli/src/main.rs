// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tileflow
//!
//! Command-line interface for the tileflow layer engine.
//!
//! ## Usage
//! ```bash
//! # Execute a layer on the host backends and verify against the
//! # untiled reference
//! tileflow run --spec layer.toml --units 4
//!
//! # Inspect the tile plan and arena layout of a layer
//! tileflow plan --spec layer.toml
//!
//! # Annotate an execution trace with source locations
//! tileflow annotate --trace trace.txt --output trace.annotated \
//!     --debug-info symbols.txt
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tileflow",
    about = "Tiled double-buffered layer execution engine",
    version
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a layer end-to-end on the host backends.
    Run {
        /// Path to a TOML layer spec; defaults to the built-in sampled
        /// depthwise layer.
        #[arg(short, long)]
        spec: Option<std::path::PathBuf>,

        /// Number of execution units in the cluster.
        #[arg(short, long, default_value_t = 4)]
        units: usize,

        /// Seed for the synthetic input/weight tensors.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Skip the untiled-reference verification pass.
        #[arg(long)]
        no_verify: bool,
    },

    /// Print the tile plan and arena layout of a layer.
    Plan {
        /// Path to a TOML layer spec; defaults to the built-in sampled
        /// depthwise layer.
        #[arg(short, long)]
        spec: Option<std::path::PathBuf>,
    },

    /// Annotate an execution trace with `file:line` debug info.
    Annotate {
        /// The whitespace-delimited trace file (header line first; each
        /// row carries an address in its third column).
        #[arg(short, long)]
        trace: std::path::PathBuf,

        /// Output path for the annotated trace.
        #[arg(short, long)]
        output: std::path::PathBuf,

        /// Pre-built debug-info files (address, source file, line).
        #[arg(short, long)]
        debug_info: Vec<std::path::PathBuf>,

        /// Binary to derive debug info from via the toolchain
        /// disassembler.
        #[arg(long)]
        elf: Option<std::path::PathBuf>,

        /// Toolchain disassembler command used with `--elf`.
        #[arg(long, default_value = "riscv32-unknown-elf-objdump")]
        objdump: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            spec,
            units,
            seed,
            no_verify,
        } => commands::run::execute(spec, units, seed, !no_verify),
        Commands::Plan { spec } => commands::plan::execute(spec),
        Commands::Annotate {
            trace,
            output,
            debug_info,
            elf,
            objdump,
        } => commands::annotate::execute(trace, output, debug_info, elf, objdump),
    }
}
