//! WHOIS Proxy CLI Application
//!
//! A command-line interface for querying WHOIS servers through a CONNECT proxy.
//! This CLI application provides a user-friendly interface to the whois-proxy-lib library.

mod output;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;
use whois_proxy_lib::{
    load_env_config, parse_timeout_string, ClientConfig, ConfigManager, EnvConfig, FileConfig,
    PatternList, WhoisProxy,
};

use crate::output::LookupRecord;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for whois-proxy
#[derive(Parser, Debug)]
#[command(name = "whois-proxy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query WHOIS servers through a CONNECT proxy")]
#[command(
    long_about = "Query WHOIS servers through a CONNECT proxy.\n\nBy default prints the referral WHOIS server found in the reply. Use --raw to print the reply itself."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain names (or other WHOIS queries) to look up
    #[arg(value_name = "DOMAINS", required = true, help_heading = "Query")]
    pub domains: Vec<String>,

    /// WHOIS server to query instead of the default (whois.iana.org)
    #[arg(short = 's', long = "server", value_name = "SERVER", help_heading = "Query")]
    pub server: Option<String>,

    /// Print the raw WHOIS reply instead of the referral server
    #[arg(short = 'r', long = "raw", help_heading = "Query")]
    pub raw: bool,

    /// Field labels to look for, in priority order (comma-separated or repeated)
    #[arg(long = "pattern", value_name = "LABEL", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Query")]
    pub patterns: Option<Vec<String>>,

    /// Proxy host or IP
    #[arg(long = "host", value_name = "HOST", help_heading = "Proxy")]
    pub host: Option<String>,

    /// Proxy port
    #[arg(long = "port", value_name = "PORT", help_heading = "Proxy")]
    pub port: Option<u16>,

    /// Connect timeout (e.g. 5s, 1m)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Proxy")]
    pub timeout: Option<String>,

    /// Timeout for each line read from the proxy (e.g. 5s, 1m)
    #[arg(long = "read-timeout", value_name = "DURATION", help_heading = "Proxy")]
    pub read_timeout: Option<String>,

    /// Stop reading after this many lines (default: 512)
    #[arg(long = "max-loop", value_name = "N", help_heading = "Proxy")]
    pub max_loop: Option<usize>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Client configuration plus the pattern list, after all layers are applied.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedConfig {
    pub(crate) client: ClientConfig,
    pub(crate) patterns: PatternList,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);

    match run_lookups(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the tracing subscriber on stderr so stdout stays clean.
///
/// `--debug` / `--verbose` win over `RUST_LOG`; otherwise `RUST_LOG` is used,
/// falling back to warnings only.
fn init_logging(args: &Args) {
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.domains.iter().all(|d| d.trim().is_empty()) {
        return Err("You must specify at least one non-empty domain".to_string());
    }

    if args.port == Some(0) {
        return Err("Proxy port must be between 1 and 65535".to_string());
    }

    if args.max_loop == Some(0) {
        return Err("--max-loop must be at least 1".to_string());
    }

    if let Some(patterns) = &args.patterns {
        if patterns.iter().all(|p| p.trim().is_empty()) {
            return Err("--pattern needs at least one non-empty label".to_string());
        }
    }

    Ok(())
}

/// Run every lookup in order. Returns `Ok(false)` if any lookup failed.
async fn run_lookups(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let resolved = build_config(&args)?;
    tracing::info!(
        proxy = %resolved.client.proxy_addr(),
        max_loop = resolved.client.max_loop,
        patterns = ?resolved.patterns.labels(),
        "configuration resolved"
    );

    let client = WhoisProxy::with_config(resolved.client).with_patterns(resolved.patterns);
    let server = args.server.as_deref();

    let mut records = Vec::with_capacity(args.domains.len());
    for domain in args.domains.iter().filter(|d| !d.trim().is_empty()) {
        let record = if args.raw {
            match client.query_whois_detailed(domain, server).await {
                Ok(outcome) => LookupRecord::raw(domain, server, outcome),
                Err(e) => LookupRecord::failed(domain, server, &e),
            }
        } else {
            match client.get_whois_server(domain, server).await {
                Ok(referral) => LookupRecord::referral(domain, server, referral),
                Err(e) => LookupRecord::failed(domain, server, &e),
            }
        };

        if !args.json {
            output::print_record(&record, args.domains.len() > 1);
        }
        records.push(record);
    }

    if args.json {
        output::print_json(&records)?;
    }

    Ok(records.iter().all(|r| r.error.is_none()))
}

/// Layer configuration: defaults, then config file, then `WP_*` environment, then CLI flags.
fn build_config(args: &Args) -> Result<ResolvedConfig, Box<dyn std::error::Error>> {
    let mut resolved = ResolvedConfig::default();
    let config_manager = ConfigManager::new();
    let env_config = load_env_config();

    // Step 1: config file
    if let Some(explicit_config_path) = &args.config {
        tracing::info!(path = %explicit_config_path, "using explicit config file (--config)");
        let file_config = config_manager.load_file(explicit_config_path).map_err(|e| {
            format!("Failed to load config file '{}': {}", explicit_config_path, e)
        })?;
        resolved = merge_file_config(resolved, &file_config);
    } else if let Some(env_config_path) = &env_config.config {
        tracing::info!(path = %env_config_path, "using explicit config file (WP_CONFIG)");
        let file_config = config_manager
            .load_file(env_config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", env_config_path, e))?;
        resolved = merge_file_config(resolved, &file_config);
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => resolved = merge_file_config(resolved, &file_config),
            Err(e) => tracing::warn!(error = %e, "config discovery failed"),
        }
    }

    // Step 2: environment variables (WP_*)
    resolved = apply_environment_config(resolved, &env_config);

    // Step 3: CLI arguments (highest precedence)
    resolved = apply_cli_args_to_config(resolved, args)?;

    Ok(resolved)
}

fn merge_file_config(mut resolved: ResolvedConfig, file_config: &FileConfig) -> ResolvedConfig {
    resolved.client = file_config.apply_to(resolved.client);
    if let Some(patterns) = file_config.pattern_list() {
        resolved.patterns = patterns;
    }
    resolved
}

fn apply_environment_config(mut resolved: ResolvedConfig, env_config: &EnvConfig) -> ResolvedConfig {
    resolved.client = env_config.apply_to(resolved.client);
    if let Some(patterns) = env_config.pattern_list() {
        resolved.patterns = patterns;
    }
    resolved
}

fn apply_cli_args_to_config(
    mut resolved: ResolvedConfig,
    args: &Args,
) -> Result<ResolvedConfig, String> {
    let mut client = resolved.client;

    if let Some(host) = &args.host {
        client.proxy_host = host.clone();
    }
    if let Some(port) = args.port {
        client.proxy_port = port;
    }
    if let Some(timeout_str) = &args.timeout {
        let timeout = parse_timeout_string(timeout_str).ok_or_else(|| {
            format!(
                "Invalid timeout '{}'. Use a non-zero value like '5s', '30s', '2m'",
                timeout_str
            )
        })?;
        client = client.with_timeout(timeout);
    }
    if let Some(timeout_str) = &args.read_timeout {
        let read_timeout = parse_timeout_string(timeout_str).ok_or_else(|| {
            format!(
                "Invalid read timeout '{}'. Use a non-zero value like '5s', '30s', '2m'",
                timeout_str
            )
        })?;
        client = client.with_read_timeout(read_timeout);
    }
    if let Some(max_loop) = args.max_loop {
        client = client.with_max_loop(max_loop);
    }
    if let Some(patterns) = &args.patterns {
        resolved.patterns = PatternList::new(patterns);
    }

    resolved.client = client;
    Ok(resolved)
}
