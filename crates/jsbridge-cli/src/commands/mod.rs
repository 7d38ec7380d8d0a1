//! Subcommand implementations and shared runtime setup.

pub mod eval;
pub mod info;
pub mod run;

use anyhow::Context as _;
use jsbridge_core::{HostFunction, HostValue, Runtime, RuntimeOptions};
use jsbridge_script::{ScriptEngine, ScriptEngineFactory};
use std::path::PathBuf;
use std::time::Duration;

/// Budget flags shared by `run` and `eval`
#[derive(clap::Args, Debug, Default)]
pub struct LimitArgs {
    /// Wall-clock budget per evaluation in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Allocator budget in bytes
    #[arg(long)]
    pub memory_limit: Option<usize>,
    /// TOML file with runtime options
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl LimitArgs {
    /// Options from the config file, overridden by explicit flags
    pub fn runtime_options(&self) -> anyhow::Result<RuntimeOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str::<RuntimeOptions>(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => RuntimeOptions::unlimited(),
        };
        if let Some(ms) = self.timeout_ms {
            options = options.with_script_runtime_limit(Duration::from_millis(ms));
        }
        if let Some(bytes) = self.memory_limit {
            options = options.with_memory_limit(bytes);
        }
        Ok(options)
    }
}

/// Engine on a runtime configured from `limits`, with `print` bound
pub fn build_engine(limits: &LimitArgs) -> anyhow::Result<ScriptEngine> {
    let options = limits.runtime_options()?;
    log::debug!("runtime options: {:?}", options);
    let runtime = Runtime::with_options(options)?;
    let mut engine = ScriptEngine::with_runtime(ScriptEngineFactory::new(), runtime);
    engine.put("print", HostFunction::variadic(print))?;
    Ok(engine)
}

fn print(args: &[HostValue]) -> Result<HostValue, jsbridge_core::HostError> {
    let line = args
        .iter()
        .map(|value| match value {
            HostValue::String(s) => s.clone(),
            other => render(other),
        })
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", line);
    Ok(HostValue::Null)
}

/// JSON text of a value, falling back to its display form
pub fn render(value: &HostValue) -> String {
    match value.to_json() {
        Ok(json) => json.to_string(),
        Err(_) => value.to_string(),
    }
}
