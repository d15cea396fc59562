use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use ggcache_protocol::Command;

use crate::Outbound;

pub type FollowerId = u64;

/// Registro de followers do leader: toda conexão aceita pelo leader entra
/// aqui no accept e sai quando o handler da conexão termina.
#[derive(Clone, Default)]
pub struct FollowerSet {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    followers: Mutex<HashMap<FollowerId, Follower>>,
    next_id: AtomicU64,
}

#[derive(Clone)]
struct Follower {
    addr: SocketAddr,
    outbound: Outbound,
}

impl FollowerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, addr: SocketAddr, outbound: Outbound) -> FollowerId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut followers = self.inner.followers.lock().await;
        followers.insert(id, Follower { addr, outbound });
        info!("follower registrado: {addr} (total: {})", followers.len());
        id
    }

    pub async fn remove(&self, id: FollowerId) -> bool {
        let mut followers = self.inner.followers.lock().await;
        match followers.remove(&id) {
            Some(follower) => {
                info!(
                    "follower removido: {} (total: {})",
                    follower.addr,
                    followers.len()
                );
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.followers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Encaminha o comando para todos os followers registrados, com uma
    /// restrição deliberada: a conexão que originou o comando (`origin`)
    /// não recebe o próprio SET de volta, pois já o aplicou.
    ///
    /// Não espera confirmação nem aplica back-pressure: uma fila cheia ou
    /// fechada é logada e o follower é pulado.
    ///
    /// Retorna quantos followers receberam o comando.
    pub async fn fan_out(&self, cmd: &Command, origin: Option<FollowerId>) -> usize {
        // Snapshot sob o lock; os envios acontecem fora dele
        let targets: Vec<(FollowerId, Follower)> = {
            let followers = self.inner.followers.lock().await;
            followers
                .iter()
                .filter(|(id, _)| Some(**id) != origin)
                .map(|(id, f)| (*id, f.clone()))
                .collect()
        };

        let frame = cmd.to_frame();
        let mut delivered = 0;

        for (id, follower) in targets {
            match follower.outbound.try_send(frame.clone()) {
                Ok(()) => {
                    debug!("{} replicado para {}", cmd.name(), follower.addr);
                    delivered += 1;
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "fila do follower {} cheia, descartando {} (id {id})",
                        follower.addr,
                        cmd.name()
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(
                        "follower {} desconectado, ignorando (id {id})",
                        follower.addr
                    );
                }
            }
        }

        delivered
    }
}
