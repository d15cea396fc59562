use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use ggcache_common::CommandError;

use crate::{Frame, Parse};

/// Comandos suportados pelo cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set {
        key: Bytes,
        value: Bytes,
        /// Enviado em nanossegundos; zero expira imediatamente.
        ttl: Duration,
    },
    Get(Bytes),
    Del(Bytes),
}

impl Command {
    /// Faz o decode de um Frame recebido em um Command.
    pub fn from_frame(frame: Frame) -> Result<Command, CommandError> {
        match frame {
            Frame::Line(line) => Command::decode(&line),
            // Uma resposta de erro vinda do peer nunca é um comando válido
            Frame::Error(_) => Err(CommandError::Unknown("ERR".into())),
        }
    }

    /// Decode de uma linha já delimitada: `SET <key> <value> <ttl_ns>`,
    /// `GET <key>` ou `DEL <key>`. Nunca retorna um comando parcial.
    pub fn decode(line: &Bytes) -> Result<Command, CommandError> {
        let mut parse = Parse::new(line);
        if parse.remaining() < 2 {
            let name = String::from_utf8_lossy(line).into_owned();
            return Err(if name.is_empty() {
                CommandError::Empty
            } else {
                CommandError::WrongArity(name)
            });
        }

        let cmd_name = parse.next_string()?.to_uppercase();

        let cmd = match cmd_name.as_str() {
            "SET" => {
                if parse.remaining() != 3 {
                    return Err(CommandError::WrongArity(cmd_name));
                }
                let key = parse.next_bytes()?;
                let value = parse.next_bytes()?;
                let ttl = parse
                    .next_u64()
                    .map_err(|e| CommandError::InvalidTtl(e.to_string()))?;
                Command::Set {
                    key,
                    value,
                    ttl: Duration::from_nanos(ttl),
                }
            }
            "GET" => {
                let key = parse.next_bytes()?;
                parse.finish()?;
                Command::Get(key)
            }
            "DEL" => {
                let key = parse.next_bytes()?;
                parse.finish()?;
                Command::Del(key)
            }
            _ => return Err(CommandError::Unknown(cmd_name)),
        };

        Ok(cmd)
    }

    /// Inverso de `decode`, sem terminador de linha.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64);
        match self {
            Command::Set { key, value, ttl } => {
                buf.put(&b"SET "[..]);
                buf.put(key.as_ref());
                buf.put_u8(b' ');
                buf.put(value.as_ref());
                buf.put_u8(b' ');
                buf.put(ttl.as_nanos().to_string().as_bytes());
            }
            Command::Get(key) => {
                buf.put(&b"GET "[..]);
                buf.put(key.as_ref());
            }
            Command::Del(key) => {
                buf.put(&b"DEL "[..]);
                buf.put(key.as_ref());
            }
        }
        buf.freeze()
    }

    /// Encoda o comando como Frame para envio.
    pub fn to_frame(&self) -> Frame {
        Frame::Line(self.encode())
    }

    /// Palavra do comando no wire, usada nos logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get(_) => "GET",
            Command::Del(_) => "DEL",
        }
    }

    /// Apenas SET é propagado para os followers; DEL não é replicado.
    pub fn is_replicated(&self) -> bool {
        matches!(self, Command::Set { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> Result<Command, CommandError> {
        Command::decode(&Bytes::from(raw.to_string()))
    }

    #[test]
    fn parse_set() {
        let cmd = decode("SET foo bar 5000000").unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                key: Bytes::from("foo"),
                value: Bytes::from("bar"),
                ttl: Duration::from_millis(5),
            }
        );
    }

    #[test]
    fn parse_set_zero_ttl() {
        match decode("SET k v 0").unwrap() {
            Command::Set { ttl, .. } => assert_eq!(ttl, Duration::ZERO),
            other => panic!("esperado SET, veio {other:?}"),
        }
    }

    #[test]
    fn parse_get_and_del() {
        assert_eq!(decode("GET foo").unwrap(), Command::Get(Bytes::from("foo")));
        assert_eq!(decode("DEL foo").unwrap(), Command::Del(Bytes::from("foo")));
    }

    #[test]
    fn parse_lowercase_command() {
        assert_eq!(decode("get foo").unwrap(), Command::Get(Bytes::from("foo")));
    }

    #[test]
    fn reject_set_too_few_tokens() {
        assert!(matches!(
            decode("SET a b"),
            Err(CommandError::WrongArity(_))
        ));
    }

    #[test]
    fn reject_set_too_many_tokens() {
        assert!(matches!(
            decode("SET a b 10 extra"),
            Err(CommandError::WrongArity(_))
        ));
    }

    #[test]
    fn reject_unknown_command() {
        assert!(matches!(decode("FOO a"), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn reject_bad_ttl() {
        assert!(matches!(
            decode("SET a b notanumber"),
            Err(CommandError::InvalidTtl(_))
        ));
        assert!(matches!(
            decode("SET a b -1"),
            Err(CommandError::InvalidTtl(_))
        ));
    }

    #[test]
    fn reject_single_token() {
        assert!(matches!(decode("GET"), Err(CommandError::WrongArity(_))));
        assert!(matches!(decode(""), Err(CommandError::Empty)));
    }

    #[test]
    fn reject_get_with_extra_tokens() {
        assert!(decode("GET a b").is_err());
        assert!(decode("DEL a b").is_err());
    }

    #[test]
    fn reject_empty_key() {
        assert!(decode("GET ").is_err());
        assert!(decode("SET  v 10").is_err());
    }

    #[test]
    fn error_frame_is_not_a_command() {
        let frame = Frame::Error("key not found".into());
        assert!(Command::from_frame(frame).is_err());
    }

    #[test]
    fn encode_matches_wire_format() {
        for raw in ["SET foo bar 5000000", "GET foo", "DEL foo", "SET k v 0"] {
            let cmd = decode(raw).unwrap();
            assert_eq!(cmd.encode(), Bytes::from(raw.to_string()));
        }
    }

    #[test]
    fn encode_canonicalizes_ttl() {
        let cmd = decode("set k v 007").unwrap();
        assert_eq!(cmd.encode(), Bytes::from("SET k v 7"));
    }

    #[test]
    fn only_set_is_replicated() {
        assert!(decode("SET a b 1").unwrap().is_replicated());
        assert!(!decode("GET a").unwrap().is_replicated());
        assert!(!decode("DEL a").unwrap().is_replicated());
    }
}
