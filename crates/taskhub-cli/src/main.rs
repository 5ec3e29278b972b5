mod config;

use clap::{Parser, Subcommand};
use config::{StoreBackend, TaskhubConfig};
use std::path::PathBuf;
use std::sync::Arc;
use taskhub_agents::{AgentRegistry, EchoAgent};
use taskhub_gateway::GatewayServer;
use taskhub_orchestrator::{TaskExecutor, TaskQueue, TaskRouter};
use taskhub_store::{ExecutionStore, FileExecutionStore, MemoryExecutionStore};
use taskhub_tenant::StaticTenantResolver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskhub", about = "taskhub: multi-tenant task dispatch hub")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "taskhub.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start workers and the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Inspect registered agents
    Agents {
        #[command(subcommand)]
        action: AgentAction,
    },
    /// Inspect configured tenants
    Tenants {
        #[command(subcommand)]
        action: TenantAction,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    /// List registered agents and their task types
    List,
}

#[derive(Subcommand)]
enum TenantAction {
    /// List configured tenants
    List,
}

fn build_registry() -> anyhow::Result<Arc<AgentRegistry>> {
    let registry = Arc::new(AgentRegistry::new());
    registry.register(Arc::new(EchoAgent::new()))?;
    Ok(registry)
}

async fn build_store(config: &TaskhubConfig) -> anyhow::Result<Arc<dyn ExecutionStore>> {
    let store: Arc<dyn ExecutionStore> = match config.store {
        StoreBackend::File => {
            let dir = config.data_dir.join("executions");
            info!(dir = %dir.display(), "Using file execution store");
            Arc::new(FileExecutionStore::new(dir).await?)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory execution store; records are lost on restart");
            Arc::new(MemoryExecutionStore::new())
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = TaskhubConfig::load(&cli.config).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let registry = build_registry()?;
            info!(count = registry.agent_count(), "Agents registered");

            let tenants = StaticTenantResolver::new(config.tenants.clone());
            info!(tenants = ?tenants.tenant_names(), "Tenant configuration loaded");
            let router = TaskRouter::new(registry.clone()).with_tenants(Arc::new(tenants));

            let store = build_store(&config).await?;
            let queue = Arc::new(TaskQueue::new(config.queue.clone()));
            let executor = Arc::new(TaskExecutor::new(router, queue, store));

            let recovered = executor.recover().await?;
            if recovered > 0 {
                info!(count = recovered, "Recovered executions from previous run");
            }

            for worker in config.effective_workers(&registry) {
                executor.start_workers(&worker.task_type, worker.concurrency)?;
            }

            let app = GatewayServer::build(executor.clone());
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            info!("taskhub gateway listening on {}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            executor.shutdown().await;
            info!("taskhub stopped");
        }
        Commands::Agents { action } => match action {
            AgentAction::List => {
                let registry = build_registry()?;
                let agents = registry.list_descriptors();
                println!("Registered agents:");
                for agent in &agents {
                    let task_types: Vec<&str> =
                        agent.capabilities.iter().map(String::as_str).collect();
                    println!("  {} ({}): {}", agent.id, agent.name, task_types.join(", "));
                }
                println!("\nTotal: {} agent(s)", agents.len());
            }
        },
        Commands::Tenants { action } => match action {
            TenantAction::List => {
                let tenants = StaticTenantResolver::new(config.tenants);
                let names = tenants.tenant_names();
                if names.is_empty() {
                    println!("No tenants configured.");
                    println!("Configure tenants in taskhub.toml under [tenants.<name>]");
                } else {
                    println!("Configured tenants:");
                    for name in &names {
                        println!("  {name}");
                    }
                }
            }
        },
    }

    Ok(())
}
