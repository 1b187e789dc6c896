use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use market_rpc::audit;
use market_rpc::error::RpcError;
use market_rpc::paths;
use market_rpc::registry::catalog;
use market_rpc::registry::request::{RpcCall, RpcRequest};
use market_rpc::registry::{build_registry, CommandOutput, CommandRegistry};
use market_rpc::service::{MarketStore, Services};
use market_rpc::settings::{self, RpcSettings};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "market-rpc",
    about = "Market RPC command-line client",
    version,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override (settings and audit logs)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Data directory override (market snapshot)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered command with its contract
    Commands,
    /// Show help for a category or command
    Help {
        /// Category slug or command name
        topic: Option<String>,
    },
    /// Invoke a command with positional params
    Call {
        name: String,
        /// Each param is parsed as JSON when it can be, else taken as a string.
        /// `true`, `123` and `null` become a bool, number and null; quote them
        /// as JSON strings (e.g. '"123"') to pass text.
        params: Vec<String>,
    },
    /// Invoke a command from a JSON envelope: {"command": "...", "params": [...]}
    Raw { envelope: String },
}

/// `42` → number, `null` → null, `mymarket` → string, `"123"` → string.
fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn init_tracing(settings: &RpcSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_services(data_dir: Option<&Path>) -> Result<Services, String> {
    let Some(dir) = data_dir else {
        return Ok(Services::in_memory());
    };
    let store = MarketStore::open(&paths::markets_path(dir)).map_err(|e| e.to_string())?;
    Ok(Services {
        markets: Arc::new(store),
    })
}

// ── Output formatting ────────────────────────────────────────────

fn print_output(output: &CommandOutput, raw_json: bool) {
    if raw_json {
        println!("{}", serde_json::to_string_pretty(output).unwrap_or_default());
    } else {
        println!("{}", output.message);
    }
}

fn print_error(error: &RpcError, raw_json: bool) {
    if raw_json {
        let json = serde_json::json!({ "error": error });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
    } else {
        eprintln!("Error: {error}");
    }
}

async fn run_call(
    registry: &CommandRegistry,
    call: RpcCall,
    settings: &RpcSettings,
    config_dir: &Path,
    raw_json: bool,
) -> i32 {
    let started = Instant::now();
    let result = registry
        .dispatch(&call.command, RpcRequest::new(call.params.clone()))
        .await;

    if settings.audit_enabled {
        audit::log_dispatch(
            config_dir,
            &call.command,
            &call.params,
            result.as_ref(),
            started.elapsed(),
        );
    }

    match result {
        Ok(output) => {
            print_output(&output, raw_json);
            0
        }
        Err(e) => {
            print_error(&e, raw_json);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);
    let settings = match settings::load_settings(&config_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };
    init_tracing(&settings);

    let data_dir = cli.data_dir.clone().or_else(|| settings.data_dir.clone());
    let services = match open_services(data_dir.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };
    let registry = match build_registry(&services) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    let code = match cli.command {
        Commands::Commands => {
            if cli.json {
                let json = catalog::to_json_schema(&registry);
                println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
            } else {
                for entry in registry.catalog() {
                    println!("{:<14} {}", entry.name, entry.description);
                    println!("{:<14} usage: {}", "", entry.usage);
                }
            }
            0
        }
        Commands::Help { topic } => {
            println!("{}", registry.help_text(topic.as_deref()));
            0
        }
        Commands::Call { name, params } => {
            let call = RpcCall {
                command: name,
                params: params.iter().map(String::as_str).map(parse_param).collect(),
            };
            run_call(&registry, call, &settings, &config_dir, cli.json).await
        }
        Commands::Raw { envelope } => match serde_json::from_str::<RpcCall>(&envelope) {
            Ok(call) => run_call(&registry, call, &settings, &config_dir, cli.json).await,
            Err(e) => {
                eprintln!("Error: invalid envelope: {e}");
                2
            }
        },
    };

    process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_param_coercion() {
        assert_eq!(parse_param("42"), json!(42));
        assert_eq!(parse_param("true"), json!(true));
        assert_eq!(parse_param("null"), Value::Null);
        assert_eq!(parse_param("mymarket"), json!("mymarket"));
        assert_eq!(parse_param("MARKETPLACE"), json!("MARKETPLACE"));
    }

    #[test]
    fn test_parse_param_quoted_text_stays_string() {
        assert_eq!(parse_param("\"123\""), json!("123"));
        assert_eq!(parse_param("\"true\""), json!("true"));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
