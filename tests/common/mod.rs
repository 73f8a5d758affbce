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

//! In-process fake searchd for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Read;
use std::io::Write;
use std::net::TcpListener;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use sphinx_client::codec::Encoder;

pub const PERSIST: u16 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: u16,
    pub version: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub version: u16,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 0,
            version: 0x119,
            body,
        }
    }

    pub fn warning(msg: &str, payload: Vec<u8>) -> Self {
        let mut enc = Encoder::new();
        enc.put_str(msg);
        let mut body = enc.into_inner();
        body.extend_from_slice(&payload);
        Self {
            status: 3,
            version: 0x119,
            body,
        }
    }

    pub fn error(msg: &str) -> Self {
        let mut enc = Encoder::new();
        enc.put_str(msg);
        Self {
            status: 1,
            version: 0x119,
            body: enc.into_inner(),
        }
    }

    pub fn retry(msg: &str) -> Self {
        Self {
            status: 2,
            ..Self::error(msg)
        }
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }
}

/// Serves scripted replies in order, one per non-persist request.
pub struct FakeDaemon {
    pub port: u16,
    requests: Arc<Mutex<Vec<Request>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeDaemon {
    pub fn start(replies: Vec<Reply>) -> Self {
        Self::start_with_protocol(1, replies)
    }

    /// `protocol` is the version the daemon announces in the handshake.
    pub fn start_with_protocol(protocol: u32, replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let script = Arc::new(Mutex::new(VecDeque::from(replies)));

        let reqs = Arc::clone(&requests);
        let conns = Arc::clone(&connections);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                conns.fetch_add(1, Ordering::SeqCst);
                serve(stream, protocol, &reqs, &script);
                if script.lock().expect("script").is_empty() {
                    break;
                }
            }
        });

        Self {
            port,
            requests,
            connections,
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("requests").clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

fn serve(
    mut stream: TcpStream,
    protocol: u32,
    requests: &Mutex<Vec<Request>>,
    script: &Mutex<VecDeque<Reply>>,
) {
    if stream.write_all(&protocol.to_be_bytes()).is_err() {
        return;
    }
    let mut hello = [0u8; 4];
    if stream.read_exact(&mut hello).is_err() {
        return;
    }
    loop {
        let mut head = [0u8; 8];
        if stream.read_exact(&mut head).is_err() {
            return;
        }
        let command = u16::from_be_bytes([head[0], head[1]]);
        let version = u16::from_be_bytes([head[2], head[3]]);
        let len = u32::from_be_bytes([head[4], head[5], head[6], head[7]]) as usize;
        let mut body = vec![0u8; len];
        if stream.read_exact(&mut body).is_err() {
            return;
        }
        requests.lock().expect("requests").push(Request {
            command,
            version,
            body,
        });
        if command == PERSIST {
            continue;
        }
        let Some(reply) = script.lock().expect("script").pop_front() else {
            return;
        };
        let mut out = Vec::with_capacity(8 + reply.body.len());
        out.extend_from_slice(&reply.status.to_be_bytes());
        out.extend_from_slice(&reply.version.to_be_bytes());
        out.extend_from_slice(&(reply.body.len() as u32).to_be_bytes());
        out.extend_from_slice(&reply.body);
        if stream.write_all(&out).is_err() {
            return;
        }
    }
}

/// Writes one search result record.
pub struct ResultWriter {
    enc: Encoder,
}

impl Default for ResultWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultWriter {
    pub fn new() -> Self {
        Self {
            enc: Encoder::new(),
        }
    }

    pub fn error(mut self, msg: &str) -> Self {
        self.enc.put_u32(1).put_str(msg);
        self
    }

    /// Schema plus matches as (id, weight, attribute u32 values).
    pub fn ok(mut self, fields: &[&str], attrs: &[(&str, u32)], matches: &[(u64, u32, Vec<u32>)]) -> Self {
        self.enc.put_u32(0);
        self.schema(fields, attrs, matches);
        self
    }

    pub fn warning(mut self, msg: &str, fields: &[&str]) -> Self {
        self.enc.put_u32(3).put_str(msg);
        self.schema(fields, &[], &[]);
        self
    }

    fn schema(&mut self, fields: &[&str], attrs: &[(&str, u32)], matches: &[(u64, u32, Vec<u32>)]) {
        self.enc.put_len(fields.len());
        for f in fields {
            self.enc.put_str(f);
        }
        self.enc.put_len(attrs.len());
        for (name, code) in attrs {
            self.enc.put_str(name).put_u32(*code);
        }
        self.enc.put_len(matches.len()).put_u32(1);
        for (id, weight, values) in matches {
            self.enc.put_u64(*id).put_u32(*weight);
            for v in values {
                self.enc.put_u32(*v);
            }
        }
        let n = matches.len() as u32;
        self.enc.put_u32(n).put_u32(n).put_u32(3);
        self.enc.put_u32(1).put_str("test").put_u32(n).put_u32(n * 2);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.enc.into_inner()
    }
}

pub fn search_body(records: Vec<ResultWriter>) -> Vec<u8> {
    records.into_iter().flat_map(ResultWriter::into_bytes).collect()
}

pub fn u32_body(value: u32) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}
