//! `jsbridge run`: Execute a JavaScript file.

use super::{build_engine, render, LimitArgs};
use crate::output::StyledOutput;
use anyhow::Context as _;
use std::path::Path;

pub fn execute(file: &str, print: bool, limits: &LimitArgs, out: &mut StyledOutput) -> anyhow::Result<()> {
    let path = Path::new(file);
    if !path.exists() {
        anyhow::bail!("File not found: {}", file);
    }
    let source = std::fs::File::open(path).with_context(|| format!("Failed to open {}", file))?;

    let mut engine = build_engine(limits)?;
    log::debug!("running {}", file);
    let value = engine.eval_reader(source)?;
    if print {
        out.line(&render(&value));
    }

    let stats = engine.runtime().stats();
    log::debug!("finished {}: {:?}", file, stats);
    Ok(())
}
