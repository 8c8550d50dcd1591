//! graphenerpc CLI — probe and query Graphene nodes from the terminal.
//!
//! Usage:
//! ```bash
//! # Probe a node (latency, chain id, head block)
//! graphenerpc probe --url wss://node.example.org
//!
//! # Print the chain id
//! graphenerpc chain-id --url wss://node.example.org
//!
//! # Send a raw call to a negotiated sub-API
//! graphenerpc call --url wss://node.example.org --api database \
//!     --method get_objects --params '[["2.1.0"]]'
//! ```

use std::env;
use std::process;
use std::time::{Duration, Instant};

use graphenerpc_core::{ApiFlags, Capability};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "probe" => cmd_probe(&args[2..]).await,
        "chain-id" => cmd_chain_id(&args[2..]).await,
        "call" => cmd_call(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("graphenerpc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("graphenerpc {}", env!("CARGO_PKG_VERSION"));
    println!("Probe and query Graphene-style blockchain nodes\n");
    println!("USAGE:");
    println!("    graphenerpc <COMMAND>\n");
    println!("COMMANDS:");
    println!("    probe      Connect to a node (latency, chain id, head block)");
    println!("    chain-id   Print the node's chain identifier");
    println!("    call       Send a raw call to a negotiated sub-API");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("CALL FLAGS:");
    println!("    --url <URL>         Node WebSocket URL        [required]");
    println!("    --api <NAME>        database|history|network_broadcast|orders|crypto");
    println!("    --method <METHOD>   Method name               [required]");
    println!("    --params <JSON>     Params as a JSON array    [default: []]");
}

async fn cmd_probe(args: &[String]) -> Result<(), String> {
    let url = parse_flag(args, "--url").ok_or("--url is required")?;

    println!("Probing {url}...");
    let start = Instant::now();
    let manager = graphenerpc_ws::connect(
        &url,
        CONNECT_TIMEOUT,
        ApiFlags::only(Capability::Database),
        None,
    )
    .await
    .map_err(|e| e.to_string())?;
    let latency = start.elapsed();

    let props = manager
        .database()
        .map_err(|e| e.to_string())?
        .get_dynamic_global_properties()
        .await
        .map_err(|e| e.to_string())?;
    let head_block = props["head_block_number"].as_u64().unwrap_or(0);

    println!("  Status:     OK");
    println!("  Chain id:   {}", manager.chain_id().map_err(|e| e.to_string())?);
    println!("  Head block: {head_block}");
    println!("  Latency:    {}ms (connect + negotiate)", latency.as_millis());

    Ok(())
}

async fn cmd_chain_id(args: &[String]) -> Result<(), String> {
    let url = parse_flag(args, "--url").ok_or("--url is required")?;

    let manager = graphenerpc_ws::connect(
        &url,
        CONNECT_TIMEOUT,
        ApiFlags::only(Capability::Database),
        None,
    )
    .await
    .map_err(|e| e.to_string())?;

    println!("{}", manager.chain_id().map_err(|e| e.to_string())?);
    Ok(())
}

async fn cmd_call(args: &[String]) -> Result<(), String> {
    let url = parse_flag(args, "--url").ok_or("--url is required")?;
    let api = parse_flag(args, "--api").unwrap_or_else(|| "database".into());
    let method = parse_flag(args, "--method").ok_or("--method is required")?;
    let params = match parse_flag(args, "--params") {
        Some(raw) => serde_json::from_str::<Vec<serde_json::Value>>(&raw)
            .map_err(|e| format!("--params is not a JSON array: {e}"))?,
        None => Vec::new(),
    };

    let capability = parse_capability(&api)?;
    let manager = graphenerpc_ws::connect(&url, CONNECT_TIMEOUT, ApiFlags::only(capability), None)
        .await
        .map_err(|e| e.to_string())?;

    let result = manager
        .api(capability)
        .map_err(|e| e.to_string())?
        .exec(&method, params)
        .await
        .map_err(|e| e.to_string())?;

    println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
    Ok(())
}

fn parse_capability(name: &str) -> Result<Capability, String> {
    Capability::ALL
        .into_iter()
        .find(|cap| cap.wire_name() == name)
        .ok_or_else(|| format!("unknown api \"{name}\""))
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}
