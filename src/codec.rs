// Copyright 2026 Sphinx Client Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Big-endian wire codec for the searchd protocol.
//!
//! ```text
//! request:  u16 command | u16 version | u32 body_len | body
//! reply:    u16 status  | u16 version | u32 body_len | body
//! string:   u32 len | bytes (no terminator)
//! array:    u32 count | elements
//! doc id:   u64 (high word first)
//! float:    f32 bits as u32
//! ```

use crate::error::Error;
use crate::error::Result;

/// Protocol version the client announces right after connecting.
pub const CLIENT_PROTOCOL: u32 = 1;

pub const HEADER_LEN: usize = 8;

/// Upper bound on a single reply body.
pub const MAX_REPLY_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Search,
    Excerpt,
    Update,
    Keywords,
    Persist,
    Status,
    FlushAttrs,
}

impl Command {
    pub fn code(self) -> u16 {
        match self {
            Command::Search => 0,
            Command::Excerpt => 1,
            Command::Update => 2,
            Command::Keywords => 3,
            Command::Persist => 4,
            Command::Status => 5,
            Command::FlushAttrs => 7,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0 => Command::Search,
            1 => Command::Excerpt,
            2 => Command::Update,
            3 => Command::Keywords,
            4 => Command::Persist,
            5 => Command::Status,
            7 => Command::FlushAttrs,
            _ => return None,
        })
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Command::Search => "search",
            Command::Excerpt => "excerpt",
            Command::Update => "update",
            Command::Keywords => "keywords",
            Command::Persist => "persist",
            Command::Status => "status",
            Command::FlushAttrs => "flushattrs",
        }
    }
}

/// Status word of a reply frame, and of each record inside a search reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    Error,
    Retry,
    Warning,
}

impl ReplyStatus {
    pub fn code(self) -> u32 {
        match self {
            ReplyStatus::Ok => 0,
            ReplyStatus::Error => 1,
            ReplyStatus::Retry => 2,
            ReplyStatus::Warning => 3,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => ReplyStatus::Ok,
            1 => ReplyStatus::Error,
            2 => ReplyStatus::Retry,
            3 => ReplyStatus::Warning,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub status: u16,
    pub version: u16,
    pub len: u32,
}

impl ReplyHeader {
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            status: u16::from_be_bytes([bytes[0], bytes[1]]),
            version: u16::from_be_bytes([bytes[2], bytes[3]]),
            len: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..2].copy_from_slice(&self.status.to_be_bytes());
        out[2..4].copy_from_slice(&self.version.to_be_bytes());
        out[4..8].copy_from_slice(&self.len.to_be_bytes());
        out
    }
}

/// Prepends the request header to an encoded body.
pub fn frame_request(command: Command, version: u16, body: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(body.len())
        .map_err(|_| Error::invalid(format!("request body too large: {} bytes", body.len())))?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&command.code().to_be_bytes());
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(body);
    Ok(out)
}

/// Formats a command version the way the daemon reports it, e.g. `1.23`.
pub fn version_label(version: u16) -> String {
    format!("{}.{}", version >> 8, version & 0xff)
}

#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_i64(&mut self, value: i64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_f32(&mut self, value: f32) -> &mut Self {
        self.put_u32(value.to_bits())
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.put_u32(u32::from(value))
    }

    /// Length-prefixed string. Lengths beyond `u32::MAX` cannot be framed
    /// anyway, so callers bound inputs before encoding.
    pub fn put_str(&mut self, value: &str) -> &mut Self {
        self.put_len(value.len());
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn put_len(&mut self, len: usize) -> &mut Self {
        self.put_u32(len as u32)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked reader over a reply body.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::protocol(format!(
                "truncated reply: need {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn get_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.get_u32()?))
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u32()? != 0)
    }

    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Length-prefixed string; invalid UTF-8 is replaced rather than rejected
    /// since the daemon stores raw bytes.
    pub fn get_str(&mut self) -> Result<String> {
        let len = self.get_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads an element count and rejects counts that cannot fit in the
    /// remaining bytes, given a minimum element size.
    pub fn get_count(&mut self, min_elem_len: usize) -> Result<usize> {
        let count = self.get_u32()? as usize;
        if min_elem_len > 0 && count > self.remaining() / min_elem_len {
            return Err(Error::protocol(format!(
                "count {count} at offset {} exceeds remaining {} bytes",
                self.pos - 4,
                self.remaining()
            )));
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_writes_big_endian() {
        let mut enc = Encoder::new();
        enc.put_u16(0x0102)
            .put_u32(0x03040506)
            .put_u64(0x0708_090a_0b0c_0d0e);
        assert_eq!(
            enc.as_slice(),
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]
        );
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut enc = Encoder::new();
        enc.put_str("abc").put_str("");
        assert_eq!(enc.as_slice(), &[0, 0, 0, 3, b'a', b'b', b'c', 0, 0, 0, 0]);

        let mut dec = Decoder::new(enc.as_slice());
        assert_eq!(dec.get_str().unwrap(), "abc");
        assert_eq!(dec.get_str().unwrap(), "");
        assert!(dec.is_empty());
    }

    #[test]
    fn document_ids_keep_all_64_bits() {
        let id = u64::MAX - 41;
        let mut enc = Encoder::new();
        enc.put_u64(id).put_i64(-5);
        let mut dec = Decoder::new(enc.as_slice());
        assert_eq!(dec.get_u64().unwrap(), id);
        assert_eq!(dec.get_i64().unwrap(), -5);
    }

    #[test]
    fn floats_travel_as_ieee_bits() {
        let mut enc = Encoder::new();
        enc.put_f32(1.5);
        assert_eq!(enc.as_slice(), &1.5f32.to_bits().to_be_bytes());
        let mut dec = Decoder::new(enc.as_slice());
        assert_eq!(dec.get_f32().unwrap(), 1.5);
    }

    #[test]
    fn truncated_reads_are_protocol_errors() {
        let mut dec = Decoder::new(&[0, 0, 0, 9, b'x']);
        let err = dec.get_str().unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.to_string().contains("truncated reply"));
    }

    #[test]
    fn oversized_counts_are_rejected() {
        let mut dec = Decoder::new(&[0, 0, 1, 0, 0, 0, 0, 0]);
        assert!(dec.get_count(4).is_err());
    }

    #[test]
    fn request_frame_has_header() {
        let framed = frame_request(Command::Keywords, 0x100, &[9, 9]).unwrap();
        assert_eq!(framed, vec![0, 3, 1, 0, 0, 0, 0, 2, 9, 9]);
    }

    #[test]
    fn reply_header_round_trips() {
        let header = ReplyHeader {
            status: 3,
            version: 0x117,
            len: 42,
        };
        assert_eq!(ReplyHeader::parse(&header.to_bytes()), header);
        assert_eq!(version_label(0x117), "1.23");
    }
}
