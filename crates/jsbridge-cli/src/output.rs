//! Colored terminal output for CLI commands.
//!
//! Uses `termcolor`. Respects the `NO_COLOR` environment variable and the
//! `--color` flag.

use jsbridge_core::BridgeError;
use jsbridge_script::ScriptError;
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Heading and optional location line for a failed command
pub fn describe(err: &anyhow::Error) -> (String, Option<String>) {
    let bridge = match err.downcast_ref::<ScriptError>() {
        Some(ScriptError::Bridge(bridge)) => Some(bridge),
        Some(ScriptError::Io(io)) => return (format!("error[Io]: {}", io), None),
        Some(ScriptError::InvalidAttribute { name, reason }) => {
            return (format!("error[InvalidAttribute]: {}: {}", name, reason), None)
        }
        None => err.downcast_ref::<BridgeError>(),
    };
    match bridge {
        Some(bridge) => {
            let location = bridge
                .location()
                .filter(|l| l.is_known())
                .map(ToString::to_string);
            (
                format!("error[{:?}]: {}", bridge.kind(), bridge.message()),
                location,
            )
        }
        None => (format!("error: {:#}", err), None),
    }
}

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    /// Create a new styled output with the given color choice.
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    /// Plain line on stdout.
    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{}", text);
    }

    /// Render a command failure on stderr.
    pub fn report(&mut self, err: &anyhow::Error) {
        let (heading, location) = describe(err);
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = writeln!(self.stderr, "{}", heading);
        let _ = self.stderr.reset();
        if let Some(location) = location {
            let _ = self.stderr.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
            let _ = writeln!(self.stderr, "  --> {}", location);
            let _ = self.stderr.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsbridge_script::ScriptEngine;

    #[test]
    fn test_describe_script_error() {
        let mut engine = ScriptEngine::new().unwrap();
        let err = engine.eval("\n\nthrow new Error('boom');").unwrap_err();
        let (heading, location) = describe(&anyhow::Error::new(err));
        assert!(heading.starts_with("error[Script]: "));
        assert!(heading.contains("boom"));
        assert!(location.unwrap().ends_with(":3"));
    }

    #[test]
    fn test_describe_every_script_error_variant() {
        let mut engine = ScriptEngine::new().unwrap();
        let err = engine.put(jsbridge_script::TIMEOUT, "soon").unwrap_err();
        let (heading, location) = describe(&anyhow::Error::new(err));
        assert!(heading.starts_with("error[InvalidAttribute]: jsbridge.timeout: "), "{}", heading);
        assert!(location.is_none());

        let missing = std::fs::File::open("/nonexistent/jsbridge/script.js").unwrap_err();
        let (heading, _) = describe(&anyhow::Error::new(ScriptError::Io(missing)));
        assert!(heading.starts_with("error[Io]: "), "{}", heading);

        let context = jsbridge_core::Runtime::new().unwrap().create_context().unwrap();
        context.close().unwrap();
        let closed = context.eval("1").unwrap_err();
        let (heading, _) = describe(&anyhow::Error::new(closed));
        assert!(heading.starts_with("error[InvalidHandle]: "), "{}", heading);
    }

    #[test]
    fn test_describe_other_error() {
        let err = anyhow::anyhow!("File not found: missing.js");
        let (heading, location) = describe(&err);
        assert_eq!(heading, "error: File not found: missing.js");
        assert!(location.is_none());
    }

    #[test]
    fn test_color_flag() {
        if std::env::var_os("NO_COLOR").is_none() {
            assert_eq!(resolve_color_choice(Some("never")), ColorChoice::Never);
            assert_eq!(resolve_color_choice(None), ColorChoice::Auto);
        }
    }
}
