//! jsbridge command-line runner
//!
//! Runs JavaScript files and inline expressions on an embedded QuickJS
//! runtime, with optional wall-clock and memory budgets.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::LimitArgs;

#[derive(Parser)]
#[command(name = "jsbridge")]
#[command(about = "Run JavaScript on an embedded QuickJS runtime", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JavaScript file
    Run {
        /// Input file
        file: String,
        /// Print the value of the last expression as JSON
        #[arg(short, long)]
        print: bool,
        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Evaluate an inline expression and print the result as JSON
    Eval {
        /// Source code to evaluate
        code: String,
        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Display engine information
    Info,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut out = output::StyledOutput::new(output::resolve_color_choice(cli.color.as_deref()));

    let result = match cli.command {
        Commands::Run {
            file,
            print,
            limits,
        } => commands::run::execute(&file, print, &limits, &mut out),
        Commands::Eval { code, limits } => commands::eval::execute(&code, &limits, &mut out),
        Commands::Info => commands::info::execute(),
    };

    if let Err(err) = result {
        out.report(&err);
        std::process::exit(1);
    }
    Ok(())
}
