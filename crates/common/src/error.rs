/// Erros de framing do protocolo de linhas.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame incompleto")]
    Incomplete,
    #[error("linha excede tamanho máximo ({0} bytes)")]
    LineTooLong(usize),
}

/// Erros de decode de comandos (MalformedCommand).
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("comando vazio")]
    Empty,
    #[error("comando desconhecido: {0}")]
    Unknown(String),
    #[error("número errado de argumentos para '{0}'")]
    WrongArity(String),
    #[error("TTL inválido: {0}")]
    InvalidTtl(String),
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
}

/// Erros do store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("key not found")]
    KeyNotFound,
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("fila de saída fechada")]
    WriterClosed,
}

/// Erro top-level do ggcache, devolvido na inicialização do nó.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Result type alias.
pub type CacheResult<T> = Result<T, CacheError>;

// Conversão implícita de io::Error → CacheError (via ConnectionError)
impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Connection(ConnectionError::Io(e))
    }
}
