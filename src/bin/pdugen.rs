//! Generate target-language source from a protocol description.
//!
//! Usage:
//!   pdugen <description-file> <target>
//!
//! The output directory comes from the target's `directory` property in the
//! description (default: current directory). Exit is non-zero on bad
//! arguments, unreadable input, parse errors, validation errors, or an
//! unknown target; warnings are printed but do not stop generation.

use anyhow::{bail, Context};
use pdugen::emit::{emitter_for, write_artifacts};
use pdugen::validate::{has_errors, validate};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 2 {
        eprintln!("Usage: pdugen <description-file> <target>");
        eprintln!("Available targets: python");
        return ExitCode::from(2);
    }
    match run(&args[0], &args[1]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(file: &str, target: &str) -> anyhow::Result<()> {
    // Configuration problems surface before any parsing happens.
    let emitter = emitter_for(target)
        .with_context(|| format!("unknown target `{}` (available: python)", target))?;
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read description file `{}`", file))?;

    let parsed = pdugen::parse(&source)?;
    for warning in &parsed.warnings {
        eprintln!("{}", warning);
    }

    let findings = validate(&parsed.model);
    for finding in &findings {
        eprintln!("{}", finding);
    }
    if has_errors(&findings) {
        bail!("description is not internally consistent; no code generated");
    }

    let artifacts = emitter.emit(&parsed.model)?;
    let out_dir = parsed
        .model
        .target(target)
        .and_then(|t| t.get("directory"))
        .unwrap_or(".")
        .to_string();
    write_artifacts(Path::new(&out_dir), &artifacts)
        .with_context(|| format!("cannot write artifacts under `{}`", out_dir))?;
    for artifact in &artifacts {
        println!("wrote {}", Path::new(&out_dir).join(&artifact.path).display());
    }
    Ok(())
}
