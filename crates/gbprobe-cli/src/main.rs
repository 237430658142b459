mod dispatch;
mod render;
mod serve;
mod tools;

use clap::{Parser, Subcommand};
use dispatch::{ContentItem, ToolOutput};
use gbprobe_session::{ConfigError, Orchestrator, OrchestratorConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tools::{ToolCall, TOOLS};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Headless Game Boy ROM inspection through mGBA", version)]
struct Args {
    /// TOML file with emulator and timing settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Where to write a captured screenshot
    #[arg(long, global = true)]
    image_out: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Tool(ToolCall),
    /// Invoke a tool by name with JSON arguments
    Call(CallArgs),
    /// Answer JSON-lines tool requests on stdin
    Serve,
    /// List the available tools
    ListTools,
}

#[derive(clap::Args, Debug)]
struct CallArgs {
    #[arg(long)]
    tool: String,
    #[arg(long, default_value = "{}")]
    arguments: String,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let orchestrator = Orchestrator::from_config(&config);

    match args.command {
        Command::Tool(call) => {
            let output = dispatch::dispatch(&orchestrator, call);
            emit(&output, args.image_out.as_deref());
        }
        Command::Call(call) => {
            let arguments = match serde_json::from_str(&call.arguments) {
                Ok(arguments) => arguments,
                Err(err) => {
                    eprintln!("Error: invalid --arguments JSON: {err}");
                    std::process::exit(1);
                }
            };
            let output = match ToolCall::from_parts(&call.tool, arguments) {
                Ok(call) => dispatch::dispatch(&orchestrator, call),
                Err(err) => ToolOutput::error(format!("Error: {err}")),
            };
            emit(&output, args.image_out.as_deref());
        }
        Command::Serve => {
            let stdin = io::stdin();
            if let Err(err) = serve::serve(&orchestrator, stdin.lock(), io::stdout().lock()) {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        }
        Command::ListTools => {
            for info in TOOLS {
                println!("{:<22} {}", info.name, info.description);
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig, ConfigError> {
    let config = match path {
        Some(path) => OrchestratorConfig::load(path)?,
        None => OrchestratorConfig::default(),
    };
    config.with_env_overrides()
}

fn emit(output: &ToolOutput, image_out: Option<&Path>) {
    for item in &output.content {
        match item {
            ContentItem::Text(text) => println!("{text}"),
            ContentItem::Image(bytes) => match image_out {
                Some(path) => match fs::write(path, bytes) {
                    Ok(()) => println!(
                        "Wrote {} byte screenshot to {}",
                        bytes.len(),
                        path.display()
                    ),
                    Err(err) => {
                        eprintln!("Error: write {}: {err}", path.display());
                        std::process::exit(1);
                    }
                },
                None => println!(
                    "Captured {} byte screenshot (pass --image-out to save it)",
                    bytes.len()
                ),
            },
        }
    }
    if output.is_error {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn tool_subcommands_parse_hex_addresses() {
        let args = Args::try_parse_from([
            "gbprobe",
            "read-memory-addresses",
            "--rom-path",
            "g.gb",
            "--address",
            "0xFFBF",
            "--address",
            "65024",
            "-v",
        ])
        .expect("parse");
        assert!(args.verbose);
        let Command::Tool(ToolCall::ReadMemoryAddresses(read)) = args.command else {
            panic!("wrong command");
        };
        assert_eq!(read.addresses, [0xFFBF, 0xFE00]);
        assert_eq!(read.frames, 60);
    }

    #[test]
    fn no_image_flag_disables_capture() {
        let args = Args::try_parse_from([
            "gbprobe",
            "run-for-frames",
            "--rom-path",
            "g.gb",
            "--no-image",
        ])
        .expect("parse");
        let Command::Tool(ToolCall::RunForFrames(run)) = args.command else {
            panic!("wrong command");
        };
        assert!(!run.capture_image);
    }
}
