use bytes::Bytes;
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Entrada no store: valor + instante de expiração + geração do SET.
#[derive(Debug)]
pub struct Entry {
    pub value: Bytes,
    pub expires_at: Option<Instant>,
    /// Identifica o SET que gravou a entrada; o timer de expiração só
    /// remove a entrada se a geração ainda for a dele.
    pub generation: u64,
    /// Timer de expiração pendente desta entrada (no máximo um por chave).
    pub expiry: Option<AbortHandle>,
}

impl Entry {
    pub fn new(
        value: Bytes,
        expires_at: Option<Instant>,
        generation: u64,
        expiry: Option<AbortHandle>,
    ) -> Self {
        Self {
            value,
            expires_at,
            generation,
            expiry,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|t| Instant::now() >= t)
            .unwrap_or(false)
    }

    /// Cancela o timer pendente, se houver.
    pub fn cancel_expiry(&self) {
        if let Some(handle) = &self.expiry {
            handle.abort();
        }
    }
}
