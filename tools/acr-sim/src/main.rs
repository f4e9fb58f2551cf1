// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Host simulator for the ACR boot flow
//! INTENT: Run one boot command against a simulated GPU described by a TOML profile
//! DEPS: acr (sim feature), clap (CLI), serde/toml (profile), sha2/hex (payload digest)
//! READINESS: Host-only tool; no device access
//! TESTS: Profile parsing, digest loader, bundled profiles end to end
//!
//! Exit status is the boot's `AcrStatus` code, or 64 when the profile
//! itself could not be used.

mod error;
mod loader;
mod profile;
mod run;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use acr_log::{Level, Sink};
use clap::Parser;

use crate::profile::{ChipKind, Profile};
use crate::run::{Outcome, Summary};

const EXIT_BAD_PROFILE: u8 = 64;

#[derive(Parser)]
#[command(name = "acr-sim", version, about = "Run an ACR boot command on a simulated GPU")]
struct Cli {
    /// Board profile (TOML).
    profile: PathBuf,
    /// Run on this chip generation instead of the profile's.
    #[arg(long, value_enum)]
    chip: Option<ChipKind>,
    /// Print firmware logs down to trace level.
    #[arg(short, long)]
    verbose: bool,
    /// Suppress firmware logs.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

struct StderrSink;

impl Sink for StderrSink {
    fn write_line(&self, _level: Level, _target: &str, line: &[u8]) {
        let mut err = io::stderr().lock();
        // A closed stderr has nowhere to report to.
        let _ = err.write_all(line);
        let _ = err.write_all(b"\n");
    }
}

static STDERR: StderrSink = StderrSink;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if !cli.quiet {
        acr_log::install_sink(&STDERR);
        acr_log::set_max_level(if cli.verbose { Level::Trace } else { Level::Info });
    }

    let summary = Profile::load(&cli.profile).and_then(|profile| run::run(&profile, cli.chip));
    match summary {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::from(summary.outcome.status().code() as u8)
        }
        Err(err) => {
            eprintln!("acr-sim: {}: {err}", cli.profile.display());
            ExitCode::from(EXIT_BAD_PROFILE)
        }
    }
}

fn print_summary(summary: &Summary) {
    println!("chip: {}", summary.chip.name());
    match &summary.outcome {
        Outcome::Booted(report) => {
            let target = report.target_config.identity;
            println!("result: ok");
            println!("target: {}:{}", target.id.name(), target.instance);
            println!(
                "region: slot {} id {} {:#x}..{:#x}",
                report.region.index, report.region.region_id, report.region.range.start, report.region.range.end
            );
            println!("image: {:#x}..{:#x}", report.image.start, report.image.end);
        }
        Outcome::Failed(failure) => {
            println!("result: {} ({:?})", failure.error, failure.error.class());
            println!("stage: {}", failure.stage.name());
            if let Some(engine) = failure.failing_engine {
                println!("engine: {}:{}", engine.id.name(), engine.instance);
            }
        }
    }
    if let Some(placed) = &summary.placed {
        println!("placed: {:#x}..{:#x}", placed.start, placed.end);
    }
    println!("status: {}", summary.outcome.status().code());
    println!("writes: {}", summary.writes);
    println!("elapsed: {} ns", summary.elapsed_ns);
}
