//! Little-endian cursor over account bytes

use solana_program::pubkey::Pubkey;

/// Forward-only reader. Every method returns `None` instead of reading past
/// the end of the buffer and leaves the cursor untouched on failure.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if n > self.remaining() {
            return None;
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(out)
    }

    pub fn le16(&mut self) -> Option<u16> {
        let raw = self.bytes(2)?;
        Some(u16::from_le_bytes([raw[0], raw[1]]))
    }

    pub fn le32(&mut self) -> Option<u32> {
        let raw = self.bytes(4)?;
        Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn pubkey(&mut self) -> Option<Pubkey> {
        let raw = self.bytes(32)?;
        Pubkey::try_from(raw).ok()
    }

    /// Borsh string: u32 length followed by that many bytes, no terminator.
    pub fn borsh_string(&mut self) -> Option<String> {
        let start = self.pos;
        let len = self.le32()? as usize;
        match self.bytes(len) {
            Some(raw) => Some(String::from_utf8_lossy(raw).into_owned()),
            None => {
                self.pos = start;
                None
            }
        }
    }
}
