//! fb-insights-mcp: MCP server for Facebook Marketing Graph API reads
//!
//! Serves the tool catalogue over stdio (JSON-RPC 2.0 and the n8n line
//! protocol) or HTTP, or runs a single tool from the command line.

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use serde_json::Value;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use fb_insights_mcp::config::{self, Config};
use fb_insights_mcp::graph::GraphClient;
use fb_insights_mcp::mcp::{serve_http, shutdown_signal, Dispatcher, StdioTransport};
use fb_insights_mcp::tools::ToolHandlers;

/// Which server transport to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// JSON-RPC 2.0 and n8n line protocol on stdin/stdout.
    Stdio,
    /// HTTP JSON on the configured host and port.
    Http,
}

/// MCP server for Facebook Marketing Graph API reads.
///
/// With TOOL given, runs that one tool and prints its result instead of
/// starting a server.
#[derive(Parser, Debug)]
#[command(name = "fb-insights-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tool to run once (e.g. facebook-list-ad-accounts)
    #[arg(value_name = "TOOL")]
    tool: Option<String>,

    /// JSON-encoded tool arguments
    #[arg(value_name = "ARGUMENTS", requires = "tool")]
    arguments: Option<String>,

    /// Server transport
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// HTTP port (overrides config and PORT)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Path to configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Write {"ready":true} to stdout before serving stdio
    #[arg(long)]
    announce_ready: bool,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logs go to stderr; stdout is reserved for protocol output.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn warn_missing_credentials(cfg: &Config) {
    for variable in cfg.credentials.missing() {
        warn!(variable, "Facebook credential not set; Graph API calls may fail");
    }
}

/// Runs one tool, writes its result to `out`, and maps it to an exit code.
async fn run_once<W: Write>(
    handlers: &ToolHandlers,
    tool: &str,
    arguments: Option<&str>,
    out: &mut W,
) -> ExitCode {
    let arguments: Value = match arguments {
        Some(raw) => match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Tool arguments are not valid JSON");
                eprintln!("Invalid JSON arguments: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Value::Object(serde_json::Map::new()),
    };

    let result = handlers.call(tool, &arguments).await;

    let json = match serde_json::to_string_pretty(&result) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialise tool result");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = writeln!(out, "{json}").and_then(|()| out.flush()) {
        error!(error = %e, "Failed to write tool result");
        return ExitCode::FAILURE;
    }

    if result.is_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Entry point for the fb-insights-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig is read from: {}", default_path.display());
                    eprintln!("See config/example-config.json for the format");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    warn_missing_credentials(&cfg);

    let client = match GraphClient::from_config(&cfg) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create Graph API client");
            return ExitCode::FAILURE;
        }
    };
    let handlers = ToolHandlers::new(Arc::new(client));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    if let Some(tool) = args.tool.as_deref() {
        let code = runtime.block_on(run_once(
            &handlers,
            tool,
            args.arguments.as_deref(),
            &mut std::io::stdout(),
        ));
        runtime.shutdown_background();
        return code;
    }

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!("fb-insights-mcp {}", env!("CARGO_PKG_VERSION"));
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?args.transport,
        "Starting fb-insights-mcp server"
    );

    let dispatcher = Dispatcher::new(handlers);

    let result = match args.transport {
        Transport::Stdio => runtime.block_on(async {
            info!("Waiting for messages on stdin");
            StdioTransport::new()
                .serve(&dispatcher, args.announce_ready, shutdown_signal())
                .await
        }),
        Transport::Http => {
            let port = match args.port.map_or_else(|| cfg.http.listen_port(), Ok) {
                Ok(port) => port,
                Err(e) => {
                    error!(error = %e, "Invalid HTTP port");
                    return ExitCode::FAILURE;
                }
            };
            let addr: SocketAddr = match format!("{}:{port}", cfg.http.host).parse() {
                Ok(addr) => addr,
                Err(e) => {
                    error!(host = %cfg.http.host, error = %e, "Invalid HTTP listen address");
                    return ExitCode::FAILURE;
                }
            };
            runtime.block_on(serve_http(dispatcher, addr, shutdown_signal()))
        }
    };

    // The blocking stdin reader cannot be cancelled; don't wait for it.
    runtime.shutdown_background();

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
