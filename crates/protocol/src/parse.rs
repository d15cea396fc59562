use bytes::Bytes;
use ggcache_common::CommandError;

/// Cursor sobre os tokens de uma linha de comando (separados por um espaço).
pub struct Parse {
    parts: Vec<Bytes>,
    pos: usize,
}

impl Parse {
    /// Separa a linha em tokens. Espaços duplicados produzem tokens vazios,
    /// rejeitados na extração.
    pub fn new(line: &Bytes) -> Parse {
        let parts = line
            .split(|&b| b == b' ')
            .map(|token| line.slice_ref(token))
            .collect();
        Parse { parts, pos: 0 }
    }

    /// Retorna o próximo token como String UTF-8.
    pub fn next_string(&mut self) -> Result<String, CommandError> {
        let data = self.next_bytes()?;
        String::from_utf8(data.to_vec())
            .map_err(|_| CommandError::InvalidArgument("string UTF-8 inválida".into()))
    }

    /// Retorna o próximo token como Bytes (sem cópia).
    pub fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        let data = self.next()?;
        if data.is_empty() {
            return Err(CommandError::InvalidArgument("token vazio".into()));
        }
        Ok(data)
    }

    /// Retorna o próximo token como inteiro não negativo.
    pub fn next_u64(&mut self) -> Result<u64, CommandError> {
        let data = self.next()?;
        let s = std::str::from_utf8(&data)
            .map_err(|_| CommandError::InvalidArgument("inteiro inválido".into()))?;
        s.parse::<u64>()
            .map_err(|_| CommandError::InvalidArgument(format!("'{s}' não é um inteiro")))
    }

    /// Verifica se todos os tokens foram consumidos.
    pub fn finish(&self) -> Result<(), CommandError> {
        if self.pos < self.parts.len() {
            Err(CommandError::InvalidArgument(
                "argumentos extras não esperados".into(),
            ))
        } else {
            Ok(())
        }
    }

    /// Retorna o número de tokens restantes.
    pub fn remaining(&self) -> usize {
        self.parts.len() - self.pos
    }

    fn next(&mut self) -> Result<Bytes, CommandError> {
        if self.pos >= self.parts.len() {
            return Err(CommandError::InvalidArgument(
                "argumentos insuficientes".into(),
            ));
        }
        let token = self.parts[self.pos].clone();
        self.pos += 1;
        Ok(token)
    }
}
