use clap::Parser;
use tracing::info;

use ggcache_common::{DEFAULT_LISTEN_ADDR, MAX_CONNECTIONS};
use ggcache_server::{Node, NodeConfig};

#[derive(Parser, Debug)]
#[command(name = "ggcache-server", about = "ggcache — cache distribuído in-memory")]
struct Args {
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
    listen_addr: String,
    /// Endereço do leader; ausente ou vazio faz deste nó o leader.
    #[arg(long)]
    leader_addr: Option<String>,
    #[arg(long, default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ggcache_server=info,ggcache_storage=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = NodeConfig {
        listen_addr: args.listen_addr,
        leader_addr: args.leader_addr,
        max_connections: args.max_connections,
    };

    let node = Node::bind(config).await?;
    info!("ggcache escutando em {}", node.local_addr()?);

    node.run_until_ctrl_c().await;

    Ok(())
}
