use std::io::{self, Cursor, Write};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use ggcache_common::DEFAULT_LISTEN_ADDR;
use ggcache_protocol::{Command, Frame};

#[derive(Parser, Debug)]
#[command(name = "ggcache-cli", about = "ggcache CLI client")]
struct Args {
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
    addr: String,

    /// Quanto esperar por um erro após SET/DEL, que não respondem em caso de sucesso
    #[arg(long, default_value_t = 100)]
    wait_ms: u64,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

/// Conexão do cliente: stream + buffer de leitura.
struct Client {
    stream: TcpStream,
    buffer: BytesMut,
    wait: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ggcache_cli=warn".into()),
        )
        .init();

    let args = Args::parse();

    let mut client = Client {
        stream: TcpStream::connect(&args.addr).await?,
        buffer: BytesMut::with_capacity(4096),
        wait: Duration::from_millis(args.wait_ms),
    };

    // Modo comando único (via argumentos)
    if !args.command.is_empty() {
        let output = client.execute(&args.command.join(" ")).await?;
        println!("{output}");
        return Ok(());
    }

    println!("Conectado a {}", args.addr);

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("ggcache> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        match client.execute(line).await {
            Ok(output) => println!("{output}"),
            Err(e) => println!("(error) {e}"),
        }
    }

    Ok(())
}

impl Client {
    /// Valida a linha localmente, envia e formata a resposta.
    async fn execute(&mut self, input: &str) -> anyhow::Result<String> {
        let line = normalize(input);
        let cmd = match Command::decode(&line) {
            Ok(cmd) => cmd,
            Err(e) => return Ok(format!("(error) {e}")),
        };

        let mut buf = BytesMut::new();
        cmd.to_frame().encode(&mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;

        let reply = match cmd {
            Command::Get(_) => Some(self.read_reply().await?),
            // SET/DEL só respondem em caso de erro
            _ => tokio::time::timeout(self.wait, self.read_reply())
                .await
                .ok()
                .transpose()?,
        };

        Ok(format_reply(reply.as_ref()))
    }

    /// Lê a próxima resposta, ignorando comandos replicados pelo leader.
    async fn read_reply(&mut self) -> anyhow::Result<Frame> {
        loop {
            let mut cursor = Cursor::new(&self.buffer[..]);
            if let Ok(frame) = Frame::parse(&mut cursor) {
                let len = cursor.position() as usize;
                let _ = self.buffer.split_to(len);
                if is_replicated_command(&frame) {
                    debug!("ignorando comando replicado: {frame:?}");
                    continue;
                }
                return Ok(frame);
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("servidor fechou a conexão"));
            }
        }
    }
}

/// Colapsa espaços em branco para um único separador.
fn normalize(input: &str) -> Bytes {
    Bytes::from(input.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// O leader encaminha SETs a todas as conexões; valores nunca têm espaço,
/// então uma linha com espaço que não é erro é um comando replicado.
fn is_replicated_command(frame: &Frame) -> bool {
    matches!(frame, Frame::Line(data) if data.contains(&b' '))
}

/// Formata uma resposta para exibição humana.
fn format_reply(reply: Option<&Frame>) -> String {
    match reply {
        None => "OK (sem resposta)".to_string(),
        Some(Frame::Error(msg)) => format!("(error) {msg}"),
        Some(Frame::Line(data)) => match std::str::from_utf8(data) {
            Ok(s) => format!("\"{s}\""),
            Err(_) => format!("(binary) {} bytes", data.len()),
        },
    }
}
