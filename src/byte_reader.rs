use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::error::DecodeError;

/// Little endian cursor over an in-memory file.
///
/// Every read is checked against the end of the buffer. A read which does not fit
/// fails with [DecodeError::Malformed] carrying the offset it started at, and the
/// cursor does not move.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader {
    data: Bytes,
    position: usize,
}

impl ByteReader {
    pub fn new(data: Bytes) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.data.len());
    }

    fn range(&self, len: usize, when: &str) -> Result<std::ops::Range<usize>, DecodeError> {
        match self.position.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(self.position..end),
            _ => Err(DecodeError::malformed(
                self.position,
                format!(
                    "{when}: needs {len} bytes but only {} remain",
                    self.remaining()
                ),
            )),
        }
    }

    /// Look at the next `len` bytes without consuming them.
    pub fn peek(&self, len: usize, when: &str) -> Result<&[u8], DecodeError> {
        let range = self.range(len, when)?;
        Ok(&self.data[range])
    }

    /// Consume the next `len` bytes. The returned value shares the underlying buffer.
    pub fn read(&mut self, len: usize, when: &str) -> Result<Bytes, DecodeError> {
        let range = self.range(len, when)?;
        self.position = range.end;
        Ok(self.data.slice(range))
    }

    pub fn skip(&mut self, len: usize, when: &str) -> Result<(), DecodeError> {
        let range = self.range(len, when)?;
        self.position = range.end;
        Ok(())
    }

    pub fn peek_u16(&self, when: &str) -> Result<u16, DecodeError> {
        Ok(LittleEndian::read_u16(self.peek(2, when)?))
    }

    pub fn read_u16(&mut self, when: &str) -> Result<u16, DecodeError> {
        let value = LittleEndian::read_u16(self.peek(2, when)?);
        self.position += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self, when: &str) -> Result<u32, DecodeError> {
        let value = LittleEndian::read_u32(self.peek(4, when)?);
        self.position += 4;
        Ok(value)
    }
}
