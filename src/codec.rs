//! Little-endian wire codec
//!
//! Hand-rolled encoder/decoder for the pool's binary ABI: little-endian
//! integers, u32 length prefixes, and counted vectors. Event payloads and
//! the sealed-note blob use this layout directly; anything inconsistent
//! here breaks compatibility with the on-chain program.

use crate::error::CodecError;

/// Append-only binary writer.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Raw bytes, no length prefix.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// u32 length prefix followed by the bytes.
    pub fn put_prefixed_bytes(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    /// UTF-8 string with a u32 length prefix.
    pub fn put_string(&mut self, value: &str) {
        self.put_prefixed_bytes(value.as_bytes());
    }

    /// u32 element count followed by each fixed-width element.
    pub fn put_array_vec(&mut self, items: &[[u8; 32]]) {
        self.put_u32(items.len() as u32);
        for item in items {
            self.buf.extend_from_slice(item);
        }
    }

    /// u32 element count; each element carries its own u32 length prefix.
    pub fn put_bytes_vec(&mut self, items: &[Vec<u8>]) {
        self.put_u32(items.len() as u32);
        for item in items {
            self.put_prefixed_bytes(item);
        }
    }

    /// u32 element count followed by each u64, little-endian.
    pub fn put_u64_vec(&mut self, items: &[u64]) {
        self.put_u32(items.len() as u32);
        for item in items {
            self.put_u64(*item);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor-based binary reader over a borrowed slice.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::TruncatedInput {
                offset: self.pos,
                needed: len,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("length checked")))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("length checked")))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.take(len)
    }

    pub fn read_array(&mut self) -> Result<[u8; 32], CodecError> {
        let bytes = self.take(32)?;
        Ok(bytes.try_into().expect("length checked"))
    }

    pub fn read_prefixed_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_prefixed_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn read_array_vec(&mut self) -> Result<Vec<[u8; 32]>, CodecError> {
        let count = self.read_u32()? as usize;
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(self.read_array()?);
        }
        Ok(items)
    }

    pub fn read_bytes_vec(&mut self) -> Result<Vec<Vec<u8>>, CodecError> {
        let count = self.read_u32()? as usize;
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(self.read_prefixed_bytes()?.to_vec());
        }
        Ok(items)
    }

    pub fn read_u64_vec(&mut self) -> Result<Vec<u64>, CodecError> {
        let count = self.read_u32()? as usize;
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(self.read_u64()?);
        }
        Ok(items)
    }
}
