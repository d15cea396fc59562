use tokio::sync::broadcast;
use tracing::{debug, warn};

use ggcache_common::ConnectionError;
use ggcache_protocol::{Command, Frame};
use ggcache_storage::Db;

use crate::replication::{FollowerId, FollowerSet};
use crate::{Connection, Outbound};

/// Quem está do outro lado da conexão, do ponto de vista deste nó.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    /// Conexão aceita por um follower.
    Client,
    /// Conexão aceita pelo leader; também é alvo de replicação.
    Follower(FollowerId),
    /// Link que o follower abriu para o leader. Nada é escrito de volta.
    Leader,
}

impl PeerKind {
    fn follower_id(self) -> Option<FollowerId> {
        match self {
            PeerKind::Follower(id) => Some(id),
            _ => None,
        }
    }
}

/// Loop principal de tratamento de uma conexão.
///
/// Os comandos de uma mesma conexão são processados em ordem. `replication`
/// só é `Some` quando este nó é o leader.
pub async fn handle_connection(
    mut conn: Connection,
    outbound: Outbound,
    peer: PeerKind,
    db: Db,
    replication: Option<&FollowerSet>,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let frame = tokio::select! {
            result = conn.read_frame() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let frame = match frame {
            Some(f) => f,
            None => return Ok(()), // EOF
        };

        if frame.is_empty() {
            continue;
        }

        let cmd = match Command::from_frame(frame) {
            Ok(cmd) => cmd,
            Err(e) => {
                reply(&outbound, peer, Frame::Error(e.to_string())).await;
                continue;
            }
        };

        debug!("comando recebido: {cmd:?}");

        let response = execute_command(&cmd, &db);

        if cmd.is_replicated()
            && let Some(followers) = replication
        {
            followers.fan_out(&cmd, peer.follower_id()).await;
        }

        if let Some(response) = response {
            reply(&outbound, peer, response).await;
        }
    }
}

/// Aplica o comando no store. SET e DEL não têm resposta em caso de sucesso.
fn execute_command(cmd: &Command, db: &Db) -> Option<Frame> {
    match cmd {
        Command::Set { key, value, ttl } => {
            db.set(key.clone(), value.clone(), *ttl);
            None
        }
        Command::Get(key) => match db.get(key) {
            Ok(value) => Some(Frame::Line(value)),
            Err(e) => Some(Frame::Error(e.to_string())),
        },
        Command::Del(key) => {
            db.delete(key);
            None
        }
    }
}

/// Escreve a resposta; falhas são logadas e o comando é dado como tratado.
async fn reply(outbound: &Outbound, peer: PeerKind, frame: Frame) {
    if peer == PeerKind::Leader {
        // Replicação é fire-and-forget: o leader não lê respostas
        if let Frame::Error(msg) = &frame {
            warn!("comando replicado rejeitado: {msg}");
        }
        return;
    }

    if let Err(e) = outbound.send(frame).await {
        warn!("falha ao enviar resposta: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;

    #[tokio::test]
    async fn set_and_del_are_silent() {
        let db = Db::new();
        let set = Command::Set {
            key: Bytes::from("k"),
            value: Bytes::from("v"),
            ttl: Duration::from_secs(5),
        };
        assert_eq!(execute_command(&set, &db), None);
        assert_eq!(execute_command(&Command::Del(Bytes::from("k")), &db), None);
        assert_eq!(execute_command(&Command::Del(Bytes::from("k")), &db), None);
    }

    #[tokio::test]
    async fn get_hit_and_miss() {
        let db = Db::new();
        db.set(Bytes::from("k"), Bytes::from("v"), Duration::from_secs(5));

        assert_eq!(
            execute_command(&Command::Get(Bytes::from("k")), &db),
            Some(Frame::line("v"))
        );
        assert_eq!(
            execute_command(&Command::Get(Bytes::from("nope")), &db),
            Some(Frame::Error("key not found".into()))
        );
    }

    #[tokio::test]
    async fn leader_link_never_gets_replies() {
        let (outbound, mut rx) = Outbound::channel(4);
        reply(&outbound, PeerKind::Leader, Frame::Error("x".into())).await;
        reply(&outbound, PeerKind::Leader, Frame::line("v")).await;
        assert!(rx.try_recv().is_err());

        reply(&outbound, PeerKind::Client, Frame::line("v")).await;
        assert_eq!(rx.try_recv().ok(), Some(Frame::line("v")));
    }
}
