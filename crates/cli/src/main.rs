//! `rusty-automation-tool` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server.
//! - `worker`   — start the flow-queue and node-queue worker pools.
//! - `migrate`  — run pending database migrations.
//! - `validate` — validate a flow JSON file and print its layered plan.

use std::sync::Arc;

use api::processor::{FlowJobProcessor, NodeJobProcessor};
use api::{AppState, Config};
use clap::{Parser, Subcommand};
use db::models::QueueKind;
use queue::{JobQueue, Worker};
use resolver::{DependencyResolver, GraphEdge, GraphNode};
use tracing::info;

#[derive(Parser)]
#[command(name = "rusty-automation-tool", about = "High-performance workflow automation engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },
    /// Start the flow-queue and node-queue worker pools.
    Worker,
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate a flow definition JSON file and print its layered plan.
    Validate {
        /// Path to the flow JSON file.
        path: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            let mut config = Config::from_env();
            config.bind = bind;
            info!("Starting API server on {}", config.bind);
            let pool = db::pool::create_pool(&config.database_url, 10).await.expect("failed to connect to database");
            api::serve(&config.bind, pool, &config).await.unwrap();
        }
        Command::Worker => {
            let config = Config::from_env();
            info!(
                flow_concurrency = config.flow_worker_concurrency,
                node_concurrency = config.node_worker_concurrency,
                "starting worker pools"
            );
            let pool = db::pool::create_pool(&config.database_url, 10).await.expect("failed to connect to database");
            let (state, supervisor_events) = AppState::new(pool, &config);
            tokio::spawn(api::supervisor_bridge::run(supervisor_events, state.registry.clone(), state.events.clone()));

            let flow_queue = JobQueue::new(state.pool.clone());
            let flow_queue = Arc::new(flow_queue);
            let flow_processor = Arc::new(FlowJobProcessor { state: state.clone() });
            let flow_worker = Worker::new(flow_queue, QueueKind::Flow, flow_processor, config.flow_worker_concurrency);

            let node_queue = Arc::new(JobQueue::new(state.pool.clone()));
            let node_processor = Arc::new(NodeJobProcessor);
            let node_worker = Worker::new(node_queue, QueueKind::Node, node_processor, config.node_worker_concurrency);

            tokio::join!(flow_worker.run(), node_worker.run());
        }
        Command::Migrate { database_url } => {
            info!("Running migrations against {database_url}");
            let pool = db::pool::create_pool(&database_url, 2).await.expect("failed to connect to database");
            db::pool::run_migrations(&pool).await.expect("migration failed");
            info!("Migrations applied successfully");
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            let flow: engine::Flow = serde_json::from_str(&content).unwrap_or_else(|e| panic!("invalid JSON: {e}"));

            let nodes: Vec<GraphNode> = flow.nodes.iter().map(|n| GraphNode { id: n.id.clone() }).collect();
            let edges: Vec<GraphEdge> = flow
                .edges
                .iter()
                .map(|e| GraphEdge { id: e.edge_id.clone(), from: e.source_node_id.clone(), to: e.target_node_id.clone() })
                .collect();

            let resolver = match DependencyResolver::new(&nodes, &edges) {
                Ok(resolver) => resolver,
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            };

            match resolver.execution_plan() {
                Ok(plan) => {
                    println!("flow is valid: {} node(s) across {} layer(s)", plan.node_count(), plan.layers.len());
                    for (i, layer) in plan.layers.iter().enumerate() {
                        println!("  layer {i}: {}", layer.join(", "));
                    }
                }
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
