use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use super::route_file::{parse_method, RouteFile, HANDLER_KEY};
use crate::dispatcher::Dispatch;
use crate::runtime_config::RouterConfig;

/// Command-line interface for muxtree
///
/// Loads route definitions from YAML and inspects or exercises the resulting
/// routing table.
#[derive(Parser)]
#[command(name = "muxtree")]
#[command(about = "Inspect and test muxtree route tables", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the radix tree of every method and any unreachable routes
    Routes {
        /// Route definitions (YAML)
        #[arg(short, long)]
        routes: PathBuf,

        /// Router configuration (YAML); defaults to MUXTREE_* environment variables
        #[arg(short, long, env = "MUXTREE_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Dispatch one or more paths and print each outcome as a JSON line
    Match {
        /// Route definitions (YAML)
        #[arg(short, long)]
        routes: PathBuf,

        /// Router configuration (YAML); defaults to MUXTREE_* environment variables
        #[arg(short, long, env = "MUXTREE_CONFIG")]
        config: Option<PathBuf>,

        /// HTTP method of the requests
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request paths
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

/// One dispatched path as printed by `match`.
#[derive(Debug, Serialize)]
pub struct MatchReport {
    pub method: String,
    pub path: String,
    pub outcome: &'static str,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
    pub request_id: Option<String>,
}

impl MatchReport {
    fn new(method: &str, path: &str, dispatch: &Dispatch) -> Self {
        let outcome = match dispatch {
            Dispatch::Handled(_) => "handled",
            Dispatch::Redirect { .. } => "redirect",
            Dispatch::MethodNotAllowed { .. } => "method_not_allowed",
            Dispatch::NotFound(_) => "not_found",
        };
        let ctx = dispatch.context();
        Self {
            method: method.to_string(),
            path: path.to_string(),
            outcome,
            status: dispatch.status(),
            route: ctx.and_then(|c| c.full_path()).map(str::to_string),
            handler: ctx.and_then(|c| c.keys().string(HANDLER_KEY)),
            params: ctx
                .map(|c| {
                    c.params()
                        .iter()
                        .map(|p| (p.key.to_string(), p.value.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            location: match dispatch {
                Dispatch::Redirect { location, .. } => Some(location.clone()),
                _ => None,
            },
            allow: match dispatch {
                Dispatch::MethodNotAllowed { allow, .. } => {
                    allow.iter().map(|m| m.to_string()).collect()
                }
                _ => Vec::new(),
            },
            request_id: ctx.map(|c| c.request_id().to_string()),
        }
    }
}

fn load_config(config: Option<&PathBuf>) -> Result<RouterConfig> {
    match config {
        Some(path) => RouterConfig::from_yaml_file(path),
        None => Ok(RouterConfig::from_env()),
    }
}

/// Execute a parsed command, writing its output to `out`.
pub fn run_cli(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Commands::Routes { routes, config } => {
            let config = load_config(config.as_ref())?;
            let dispatcher = RouteFile::from_yaml_file(routes)?.build_dispatcher(config)?;
            let router = dispatcher.router();
            for line in router.dump_routes() {
                writeln!(out, "{}", line)?;
            }
            for shadowed in router.shadowed_routes() {
                writeln!(
                    out,
                    "unreachable: {} {} (shadowed by {})",
                    shadowed.method, shadowed.pattern, shadowed.shadowed_by
                )?;
            }
        }
        Commands::Match {
            routes,
            config,
            method,
            paths,
        } => {
            let config = load_config(config.as_ref())?;
            let dispatcher = RouteFile::from_yaml_file(routes)?.build_dispatcher(config)?;
            let http_method = parse_method(method)?;
            for path in paths {
                let dispatch = dispatcher.dispatch(&http_method, path);
                let report = MatchReport::new(http_method.as_str(), path, &dispatch);
                writeln!(out, "{}", serde_json::to_string(&report)?)?;
            }
        }
    }
    Ok(())
}
