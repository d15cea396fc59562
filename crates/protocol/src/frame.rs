use std::io::Cursor;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ggcache_common::{MAX_LINE_SIZE, ProtocolError};

const ERROR_PREFIX: &[u8] = b"ERR ";

/// Um frame do protocolo: uma linha terminada em `\n`.
///
/// Valores nunca contêm espaços (o decode separa tokens por espaço), então
/// uma linha que começa com `ERR ` é sempre uma resposta de erro.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Comando ou valor bruto.
    Line(Bytes),
    /// Resposta de erro, sem o prefixo `ERR `.
    Error(String),
}

impl Frame {
    /// Verifica se uma linha completa está disponível no buffer sem alocar.
    /// Retorna Ok(()) se completa, Err(Incomplete) se precisa mais dados.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        get_line(src)?;
        Ok(())
    }

    /// Faz o parse de uma linha completa a partir do cursor.
    /// Deve ser chamado apenas após `check()` retornar Ok.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, ProtocolError> {
        let line = get_line(src)?;
        match line.strip_prefix(ERROR_PREFIX) {
            Some(msg) => Ok(Frame::Error(String::from_utf8_lossy(msg).into_owned())),
            None => Ok(Frame::Line(Bytes::copy_from_slice(line))),
        }
    }

    /// Encoda o frame no buffer de saída, com o terminador.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Line(data) => {
                dst.put(data.as_ref());
            }
            Frame::Error(msg) => {
                dst.put(ERROR_PREFIX);
                dst.put(msg.as_bytes());
            }
        }
        dst.put_u8(b'\n');
    }

    /// Helper: cria um Frame::Line a partir de &str.
    pub fn line(s: &str) -> Frame {
        Frame::Line(Bytes::from(s.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Frame::Line(data) if data.is_empty())
    }
}

/// Lê até o próximo `\n`, descartando um `\r` final.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();
    let pending = &buf[start..];

    let Some(offset) = pending.iter().position(|&b| b == b'\n') else {
        if pending.len() > MAX_LINE_SIZE {
            return Err(ProtocolError::LineTooLong(pending.len()));
        }
        return Err(ProtocolError::Incomplete);
    };

    let mut line = &pending[..offset];
    if let Some(stripped) = line.strip_suffix(b"\r") {
        line = stripped;
    }
    if line.len() > MAX_LINE_SIZE {
        return Err(ProtocolError::LineTooLong(line.len()));
    }

    src.advance(offset + 1);
    Ok(line)
}
