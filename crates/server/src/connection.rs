use bytes::BytesMut;
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use ggcache_common::{
    ConnectionError, INITIAL_BUFFER_CAPACITY, OUTBOUND_QUEUE_CAPACITY, ProtocolError,
};
use ggcache_protocol::Frame;

/// Lado de leitura de uma conexão TCP: acumula bytes e extrai linhas.
pub struct Connection {
    reader: OwnedReadHalf,
    buffer: BytesMut,
}

/// Fila de saída de uma conexão. Respostas e comandos replicados passam
/// pela mesma fila; uma task dedicada escreve no socket.
#[derive(Clone, Debug)]
pub struct Outbound {
    tx: mpsc::Sender<Frame>,
}

impl Connection {
    /// Separa o stream em leitura e escrita e inicia a task escritora.
    pub fn new(stream: TcpStream) -> (Self, Outbound) {
        let (reader, writer) = stream.into_split();
        let (outbound, rx) = Outbound::channel(OUTBOUND_QUEUE_CAPACITY);

        tokio::spawn(async move {
            if let Err(e) = write_loop(BufWriter::new(writer), rx).await {
                warn!("erro de escrita na conexão: {e}");
            }
        });

        let conn = Self {
            reader,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        };
        (conn, outbound)
    }

    /// Lê um frame completo do stream. Retorna None no EOF.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            let n = self.reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ConnectionError::ConnectionReset);
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let mut cursor = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut cursor) {
            Ok(()) => {
                let len = cursor.position() as usize;
                cursor.set_position(0);
                let frame = Frame::parse(&mut cursor)?;
                self.buffer = self.buffer.split_off(len);
                Ok(Some(frame))
            }
            Err(ProtocolError::Incomplete) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Outbound {
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enfileira um frame, aguardando espaço na fila.
    pub async fn send(&self, frame: Frame) -> Result<(), ConnectionError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| ConnectionError::WriterClosed)
    }

    /// Enfileira sem bloquear; falha se a fila estiver cheia ou fechada.
    pub fn try_send(&self, frame: Frame) -> Result<(), mpsc::error::TrySendError<Frame>> {
        self.tx.try_send(frame)
    }
}

/// Consome a fila de saída até todos os `Outbound` serem descartados.
async fn write_loop(
    mut stream: BufWriter<OwnedWriteHalf>,
    mut rx: mpsc::Receiver<Frame>,
) -> Result<(), ConnectionError> {
    let mut buf = BytesMut::new();

    while let Some(frame) = rx.recv().await {
        frame.encode(&mut buf);
        // Agrupa o que já estiver na fila em uma única escrita
        while let Ok(next) = rx.try_recv() {
            next.encode(&mut buf);
        }
        stream.write_all(&buf).await?;
        stream.flush().await?;
        buf.clear();
    }

    debug!("fila de saída encerrada");
    stream.shutdown().await?;
    Ok(())
}
