//! `jsbridge eval`: Evaluate an inline expression.

use super::{build_engine, render, LimitArgs};
use crate::output::StyledOutput;

pub fn execute(code: &str, limits: &LimitArgs, out: &mut StyledOutput) -> anyhow::Result<()> {
    let mut engine = build_engine(limits)?;
    let value = engine.eval(code)?;
    out.line(&render(&value));
    Ok(())
}
