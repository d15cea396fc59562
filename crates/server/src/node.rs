use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, broadcast};
use tracing::{error, info, warn};

use ggcache_common::{CacheResult, DEFAULT_LISTEN_ADDR, MAX_CONNECTIONS};
use ggcache_storage::Db;

use crate::handler::PeerKind;
use crate::replication::FollowerSet;
use crate::{Connection, handle_connection};

/// Papel do nó, fixo durante toda a vida do processo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower { leader_addr: String },
}

/// Configuração de inicialização do nó.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub listen_addr: String,
    /// Vazio ou ausente: este nó é o leader.
    pub leader_addr: Option<String>,
    pub max_connections: usize,
}

impl NodeConfig {
    pub fn leader(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            leader_addr: None,
            max_connections: MAX_CONNECTIONS,
        }
    }

    pub fn follower(listen_addr: impl Into<String>, leader_addr: impl Into<String>) -> Self {
        Self {
            leader_addr: Some(leader_addr.into()),
            ..Self::leader(listen_addr)
        }
    }

    pub fn role(&self) -> Role {
        match self.leader_addr.as_deref() {
            Some(addr) if !addr.is_empty() => Role::Follower {
                leader_addr: addr.to_string(),
            },
            _ => Role::Leader,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::leader(DEFAULT_LISTEN_ADDR)
    }
}

/// Um nó do cache: dono do socket de escuta, do store e, no leader, do
/// registro de followers.
pub struct Node {
    listener: TcpListener,
    role: Role,
    db: Db,
    followers: FollowerSet,
    max_connections: usize,
}

impl Node {
    /// Faz o bind do endereço de escuta. É o único erro fatal do nó.
    pub async fn bind(config: NodeConfig) -> CacheResult<Node> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        Ok(Node {
            listener,
            role: config.role(),
            db: Db::new(),
            followers: FollowerSet::new(),
            max_connections: config.max_connections,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn db(&self) -> Db {
        self.db.clone()
    }

    pub fn followers(&self) -> FollowerSet {
        self.followers.clone()
    }

    /// Aceita conexões até `shutdown` completar.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let Node {
            listener,
            role,
            db,
            followers,
            max_connections,
        } = self;
        tokio::pin!(shutdown);

        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        match &role {
            Role::Leader => info!("nó iniciado como leader"),
            Role::Follower { leader_addr } => {
                info!("nó iniciado como follower de {leader_addr}");
                tokio::spawn(follow_leader(
                    leader_addr.clone(),
                    db.clone(),
                    shutdown_tx.subscribe(),
                ));
            }
        }

        let semaphore = Arc::new(Semaphore::new(max_connections));

        loop {
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
                _ = &mut shutdown => {
                    info!("shutdown signal recebido");
                    break;
                }
            };

            let (socket, addr) = tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok(v) => v,
                        Err(e) => {
                            error!("erro ao aceitar conexão: {e}");
                            continue;
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown signal recebido");
                    break;
                }
            };

            info!("nova conexão: {addr}");
            let db = db.clone();
            let followers = (role == Role::Leader).then(|| followers.clone());
            let mut shutdown_rx = shutdown_tx.subscribe();

            tokio::spawn(async move {
                serve_connection(socket, addr, db, followers, &mut shutdown_rx).await;
                drop(permit);
            });
        }

        drop(shutdown_tx);
    }

    pub async fn run_until_ctrl_c(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("falha ao instalar handler de ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

/// Trata uma conexão aceita. No leader, a conexão fica registrada como
/// follower enquanto o handler estiver ativo.
async fn serve_connection(
    socket: TcpStream,
    addr: SocketAddr,
    db: Db,
    followers: Option<FollowerSet>,
    shutdown: &mut broadcast::Receiver<()>,
) {
    let (conn, outbound) = Connection::new(socket);

    let peer = match &followers {
        Some(set) => PeerKind::Follower(set.register(addr, outbound.clone()).await),
        None => PeerKind::Client,
    };

    if let Err(e) =
        handle_connection(conn, outbound, peer, db, followers.as_ref(), shutdown).await
    {
        error!("erro na conexão {addr}: {e}");
    }

    if let (Some(set), PeerKind::Follower(id)) = (&followers, peer) {
        set.remove(id).await;
    }
    info!("conexão encerrada: {addr}");
}

/// Abre o link com o leader uma única vez. Sem retry: se falhar, o nó segue
/// atendendo clientes locais, apenas sem replicação.
async fn follow_leader(leader_addr: String, db: Db, mut shutdown: broadcast::Receiver<()>) {
    let stream = match TcpStream::connect(&leader_addr).await {
        Ok(s) => s,
        Err(e) => {
            error!("falha ao conectar no leader {leader_addr}: {e}. Seguindo sem replicação");
            return;
        }
    };

    info!("conectado ao leader {leader_addr}");
    let (conn, outbound) = Connection::new(stream);

    if let Err(e) =
        handle_connection(conn, outbound, PeerKind::Leader, db, None, &mut shutdown).await
    {
        error!("erro no link com o leader {leader_addr}: {e}");
    }
    warn!("link com o leader {leader_addr} encerrado");
}
