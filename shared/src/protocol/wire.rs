//! Little-endian primitive codec used by every message body.
//!
//! Scalars and strings are written by hand; fixed-width payload records are
//! delegated to bincode, whose default configuration (fixed-size integers,
//! little-endian) matches the on-wire layout exactly.

use crate::time::Span;
use crate::UnknownTag;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload truncated: {needed} more bytes expected")]
    Truncated { needed: usize },
    #[error(transparent)]
    UnknownTag(#[from] UnknownTag),
    #[error("invalid string length {0}")]
    InvalidLength(i32),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid boolean byte {0}")]
    InvalidBool(u8),
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
    #[error("record decode failed: {0}")]
    Record(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("string of {0} bytes does not fit a length prefix")]
    StringTooLong(usize),
    #[error("spawn points never travel on the wire")]
    UnsupportedObject,
    #[error("record encode failed: {0}")]
    Record(String),
}

#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        WireWriter { buf: Vec::new() }
    }

    pub fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn span(&mut self, value: Span) {
        self.buf.extend_from_slice(&value.ticks().to_le_bytes());
    }

    /// Byte count as `i32` followed by the UTF-8 bytes.
    pub fn string(&mut self, value: &str) -> Result<(), EncodeError> {
        let len = i32::try_from(value.len()).map_err(|_| EncodeError::StringTooLong(value.len()))?;
        self.i32(len);
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn record<T: Serialize>(&mut self, value: &T) -> Result<(), EncodeError> {
        bincode::serialize_into(&mut self.buf, value).map_err(|e| EncodeError::Record(e.to_string()))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        WireReader { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        if self.buf.len() < N {
            return Err(DecodeError::Truncated {
                needed: N - self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(N);
        self.buf = tail;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(head);
        Ok(bytes)
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn bool(&mut self) -> Result<bool, DecodeError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidBool(other)),
        }
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn span(&mut self) -> Result<Span, DecodeError> {
        Ok(Span::from_ticks(i64::from_le_bytes(self.take()?)))
    }

    pub fn string(&mut self) -> Result<String, DecodeError> {
        let len = self.i32()?;
        let count = usize::try_from(len).map_err(|_| DecodeError::InvalidLength(len))?;
        if self.buf.len() < count {
            return Err(DecodeError::Truncated {
                needed: count - self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(count);
        self.buf = tail;
        String::from_utf8(head.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn record<T: DeserializeOwned>(&mut self) -> Result<T, DecodeError> {
        bincode::deserialize_from(&mut self.buf).map_err(|e| DecodeError::Record(e.to_string()))
    }

    /// Fails when bytes are left over after a complete message.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.buf.len() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}
