use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as Slot;
use tokio::time::{Duration, Instant};
use tracing::debug;

use ggcache_common::StorageError;

use crate::entry::Entry;

/// Estado compartilhado entre todas as conexões e timers de expiração.
struct SharedState {
    /// Lock particionado por hash da chave: toda mutação (inclusive a
    /// expiração) passa pelo lock exclusivo do shard.
    data: DashMap<Bytes, Entry>,
    next_generation: AtomicU64,
}

/// Handle para o cache in-memory.
#[derive(Clone)]
pub struct Db {
    shared: Arc<SharedState>,
}

impl Db {
    pub fn new() -> Self {
        Db {
            shared: Arc::new(SharedState {
                data: DashMap::new(),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Retorna o valor se presente e não expirado. Uma entrada expirada
    /// ainda não removida conta como miss e é removida aqui.
    pub fn get(&self, key: &[u8]) -> Result<Bytes, StorageError> {
        match self.shared.data.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(entry.value.clone()),
            Some(entry) => drop(entry),
            None => return Err(StorageError::KeyNotFound),
        }

        // Re-checa sob o lock exclusivo: um SET concorrente pode ter
        // sobrescrito a chave entre os dois acessos.
        if let Some((_, expired)) = self.shared.data.remove_if(key, |_, e| e.is_expired()) {
            expired.cancel_expiry();
        }
        Err(StorageError::KeyNotFound)
    }

    /// Insere ou sobrescreve a chave e agenda a expiração. O timer da
    /// entrada anterior, se houver, é cancelado.
    ///
    /// Precisa de um runtime tokio ativo (o timer roda em uma task).
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Duration) {
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        // TTL fora do alcance de Instant: a entrada nunca expira
        let expires_at = Instant::now().checked_add(ttl);

        // O lock do shard fica retido até a inserção: o timer não consegue
        // remover nada antes de a entrada nova existir.
        let slot = self.shared.data.entry(key.clone());

        let expiry = expires_at.map(|when| {
            let shared = Arc::downgrade(&self.shared);
            tokio::spawn(async move {
                tokio::time::sleep_until(when).await;
                expire_key(shared, key, generation);
            })
            .abort_handle()
        });
        let entry = Entry::new(value, expires_at, generation, expiry);

        match slot {
            Slot::Occupied(mut occupied) => occupied.insert(entry).cancel_expiry(),
            Slot::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
    }

    /// Remove a chave se existir. Remover chave inexistente não é erro.
    pub fn delete(&self, key: &[u8]) -> bool {
        match self.shared.data.remove(key) {
            Some((_, entry)) => {
                entry.cancel_expiry();
                true
            }
            None => false,
        }
    }

    /// Checagem de existência com a mesma semântica de expiração do `get`.
    pub fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_ok()
    }

    /// Número de entradas fisicamente presentes (inclui expiradas ainda
    /// não removidas).
    pub fn len(&self) -> usize {
        self.shared.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.data.is_empty()
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

/// Ação de expiração de um SET: só remove a entrada que ele gravou.
fn expire_key(shared: Weak<SharedState>, key: Bytes, generation: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    if shared
        .data
        .remove_if(&key, |_, e| e.generation == generation)
        .is_some()
    {
        debug!("key expirada removida: {}", String::from_utf8_lossy(&key));
    }
}
