// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `tileflow annotate`: join an execution trace with debug info.
//!
//! The trace is whitespace-delimited with a header line; each data row
//! carries an instruction address in its third column. Debug info comes
//! from pre-built files or from invoking the toolchain disassembler on a
//! binary; each debug line's first token is the address key, its third
//! token the source file, and its sixth token the line number. The tool
//! re-emits the trace with `file:line` inserted as a new fourth column —
//! or the `???` placeholder when an address has no match — in fixed-width
//! columns, with any trailing columns passed through verbatim.
//!
//! A missing address degrades per row; a failing toolchain invocation
//! aborts the whole run before any output is written.

use anyhow::Context;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;

/// Marker emitted when an address has no debug-info match.
const PLACEHOLDER: &str = "???";

pub fn execute(
    trace: PathBuf,
    output: PathBuf,
    debug_info: Vec<PathBuf>,
    elf: Option<PathBuf>,
    objdump: String,
) -> anyhow::Result<()> {
    let mut info = DebugInfo::default();
    for path in &debug_info {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read debug info '{}'", path.display()))?;
        info.extend_from_lines(&content);
    }
    if let Some(elf) = &elf {
        // A failing disassembler aborts the run; nothing is written.
        info.extend_from_lines(&disassemble(&objdump, elf)?);
    }

    let trace_content = std::fs::read_to_string(&trace)
        .with_context(|| format!("cannot read trace '{}'", trace.display()))?;
    let annotated = annotate_trace(&trace_content, &info);

    std::fs::write(&output, annotated)
        .with_context(|| format!("cannot write '{}'", output.display()))?;
    println!(
        "annotated {} rows ({} addresses known)",
        trace_content.lines().count().saturating_sub(1),
        info.len(),
    );
    Ok(())
}

/// Runs the toolchain disassembler and captures its output.
fn disassemble(objdump: &str, elf: &std::path::Path) -> anyhow::Result<String> {
    let result = Command::new(objdump)
        .arg("-d")
        .arg("-l")
        .arg(elf)
        .output()
        .with_context(|| format!("cannot invoke '{objdump}'"))?;
    if !result.status.success() {
        anyhow::bail!(
            "'{objdump}' failed with {}: {}",
            result.status,
            String::from_utf8_lossy(&result.stderr).trim(),
        );
    }
    Ok(String::from_utf8_lossy(&result.stdout).into_owned())
}

/// Address → source location map built from debug-info lines.
#[derive(Debug, Default)]
struct DebugInfo {
    map: HashMap<String, String>,
}

impl DebugInfo {
    /// Parses lines of the form `<address> <..> <file> <..> <..> <line>`.
    ///
    /// Lines with fewer than six tokens or a non-numeric line token are
    /// skipped — the disassembler interleaves them with code lines.
    fn extend_from_lines(&mut self, content: &str) {
        for line in content.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 6 {
                continue;
            }
            if tokens[5].parse::<u64>().is_err() {
                continue;
            }
            self.map.insert(
                normalize_address(tokens[0]),
                format!("{}:{}", tokens[2], tokens[5]),
            );
        }
    }

    fn lookup(&self, address: &str) -> Option<&str> {
        self.map.get(&normalize_address(address)).map(String::as_str)
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Canonical address form: lowercase, no `0x` prefix, no leading zeros.
fn normalize_address(token: &str) -> String {
    let lower = token.to_ascii_lowercase();
    let stripped = lower.strip_prefix("0x").unwrap_or(&lower);
    let trimmed = stripped.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Re-emits the trace with `file:line` as a new fourth column.
fn annotate_trace(trace: &str, info: &DebugInfo) -> String {
    let mut out = String::new();
    let mut lines = trace.lines();

    // Header line passes through verbatim.
    if let Some(header) = lines.next() {
        out.push_str(header);
        out.push('\n');
    }

    for line in lines {
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 3 {
            // Not a trace row; keep it untouched.
            out.push_str(line);
            out.push('\n');
            continue;
        }
        let location = info.lookup(columns[2]).unwrap_or(PLACEHOLDER);
        out.push_str(&format!(
            "{:<12} {:<12} {:<14} {:<24}",
            columns[0], columns[1], columns[2], location,
        ));
        if columns.len() > 3 {
            out.push_str(&columns[3..].join(" "));
        }
        // Fixed-width formatting pads the tail; trim before the newline.
        while out.ends_with(' ') {
            out.pop();
        }
        out.push('\n');
    }
    out
}
