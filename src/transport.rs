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

//! Connection handling: endpoint resolution, handshake, request framing and
//! reply status processing.

use std::fmt;
use std::io::Read;
use std::io::Write;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::codec::CLIENT_PROTOCOL;
use crate::codec::Command;
use crate::codec::Decoder;
use crate::codec::HEADER_LEN;
use crate::codec::MAX_REPLY_LEN;
use crate::codec::ReplyHeader;
use crate::codec::ReplyStatus;
use crate::codec::frame_request;
use crate::codec::version_label;
use crate::error::Error;
use crate::error::Result;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9312;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Tcp {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Endpoint {
    /// A host starting with `/` or `unix://` names a local socket.
    pub fn parse(host: &str, port: u16) -> Result<Self> {
        if host.is_empty() {
            return Err(Error::invalid("host must not be empty"));
        }
        if let Some(path) = host.strip_prefix("unix://") {
            return Self::unix(path);
        }
        if host.starts_with('/') {
            return Self::unix(host);
        }
        if port == 0 {
            return Err(Error::invalid("port must be in 1..=65535"));
        }
        Ok(Endpoint::Tcp {
            host: host.to_string(),
            port,
        })
    }

    pub fn unix(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::invalid("socket path must not be empty"));
        }
        Ok(Endpoint::Unix(path))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Unopened,
    Connecting,
    Connected,
    Faulted,
    Closed,
}

#[derive(Debug)]
enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Stream::Unix(s) => s.flush(),
        }
    }
}

impl Stream {
    fn set_io_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        match self {
            Stream::Tcp(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
            #[cfg(unix)]
            Stream::Unix(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
        }
    }
}

/// Body of a successful reply plus the warning the daemon attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub body: Vec<u8>,
    pub warning: Option<String>,
}

#[derive(Debug)]
pub struct Transport {
    endpoint: Endpoint,
    connect_timeout: Duration,
    retries: u32,
    retry_delay: Duration,
    persistent: Option<Stream>,
    state: ConnState,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(Endpoint::default())
    }
}

impl Transport {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: Duration::from_secs(1),
            retries: 0,
            retry_delay: Duration::ZERO,
            persistent: None,
            state: ConnState::Unopened,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent.is_some()
    }

    /// Changing the endpoint drops a persistent connection.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        if self.endpoint != endpoint && self.persistent.take().is_some() {
            debug!(old = %self.endpoint, new = %endpoint, "dropping persistent connection");
            self.state = ConnState::Closed;
        }
        self.endpoint = endpoint;
    }

    /// Zero disables the timeout.
    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Extra connection attempts after the first one fails.
    pub fn set_retries(&mut self, retries: u32, delay: Duration) {
        self.retries = retries;
        self.retry_delay = delay;
    }

    /// Opens a persistent connection reused by later requests.
    pub fn open(&mut self) -> Result<()> {
        if self.persistent.is_some() {
            return Err(Error::invalid("already connected"));
        }
        let mut stream = self.connect()?;
        let frame = frame_request(Command::Persist, 0, &1u32.to_be_bytes())?;
        if let Err(err) = stream.write_all(&frame).and_then(|_| stream.flush()) {
            self.state = ConnState::Faulted;
            return Err(Error::io("failed to send persist request", err));
        }
        debug!(endpoint = %self.endpoint, "persistent connection opened");
        self.persistent = Some(stream);
        self.state = ConnState::Connected;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        if self.persistent.take().is_none() {
            return Err(Error::invalid("not connected"));
        }
        debug!(endpoint = %self.endpoint, "persistent connection closed");
        self.state = ConnState::Closed;
        Ok(())
    }

    /// Sends one command and returns the reply body once the status word has
    /// been handled.
    pub fn request(&mut self, command: Command, version: u16, body: &[u8]) -> Result<Reply> {
        let frame = frame_request(command, version, body)?;
        let (header, reply) = match self.persistent.take() {
            Some(mut stream) => match exchange(&mut stream, &frame) {
                Ok(out) => {
                    self.persistent = Some(stream);
                    out
                }
                Err(err) => {
                    warn!(endpoint = %self.endpoint, error = %err, "persistent connection faulted");
                    self.state = ConnState::Faulted;
                    return Err(err);
                }
            },
            None => {
                let mut stream = self.connect()?;
                let out = exchange(&mut stream, &frame);
                self.state = if out.is_ok() {
                    ConnState::Closed
                } else {
                    ConnState::Faulted
                };
                out?
            }
        };
        debug!(
            command = command.as_label(),
            status = header.status,
            len = header.len,
            "reply received"
        );
        process_reply(header, reply, version)
    }

    fn connect(&mut self) -> Result<Stream> {
        self.state = ConnState::Connecting;
        let mut attempt = 0;
        loop {
            match self.connect_once() {
                Ok(stream) => return Ok(stream),
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        endpoint = %self.endpoint,
                        attempt,
                        error = %err,
                        "connect failed, retrying"
                    );
                    thread::sleep(self.retry_delay);
                }
                Err(err) => {
                    self.state = ConnState::Faulted;
                    return Err(err);
                }
            }
        }
    }

    fn connect_once(&self) -> Result<Stream> {
        let mut stream = self.open_stream().map_err(|source| Error::Connect {
            endpoint: self.endpoint.to_string(),
            source,
        })?;
        let timeout = (!self.connect_timeout.is_zero()).then_some(self.connect_timeout);
        stream
            .set_io_timeout(timeout)
            .map_err(|err| Error::io("failed to set socket timeout", err))?;
        handshake(&mut stream)?;
        debug!(endpoint = %self.endpoint, "connected");
        Ok(stream)
    }

    fn open_stream(&self) -> std::io::Result<Stream> {
        match &self.endpoint {
            Endpoint::Tcp { host, port } => {
                if self.connect_timeout.is_zero() {
                    return Ok(Stream::Tcp(TcpStream::connect((host.as_str(), *port))?));
                }
                let mut last_err = None;
                for addr in (host.as_str(), *port).to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                        Ok(stream) => return Ok(Stream::Tcp(stream)),
                        Err(err) => last_err = Some(err),
                    }
                }
                Err(last_err.unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
                }))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Stream::Unix(std::os::unix::net::UnixStream::connect(
                path,
            )?)),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "unix sockets are not available on this platform",
            )),
        }
    }
}

fn handshake(stream: &mut Stream) -> Result<()> {
    stream
        .write_all(&CLIENT_PROTOCOL.to_be_bytes())
        .map_err(|err| Error::io("failed to send client protocol version", err))?;
    let mut buf = [0u8; 4];
    stream
        .read_exact(&mut buf)
        .map_err(|err| Error::io("failed to read searchd protocol version", err))?;
    let version = u32::from_be_bytes(buf);
    if version < 1 {
        return Err(Error::protocol(format!(
            "expected searchd protocol version 1+, got version '{version}'"
        )));
    }
    Ok(())
}

fn exchange(stream: &mut Stream, frame: &[u8]) -> Result<(ReplyHeader, Vec<u8>)> {
    stream
        .write_all(frame)
        .and_then(|_| stream.flush())
        .map_err(|err| Error::io("failed to send request", err))?;

    let mut head = [0u8; HEADER_LEN];
    stream
        .read_exact(&mut head)
        .map_err(|err| Error::io("failed to read searchd response header", err))?;
    let header = ReplyHeader::parse(&head);
    let len = header.len as usize;
    if len == 0 {
        return Err(Error::protocol("received zero-sized searchd response"));
    }
    if len > MAX_REPLY_LEN {
        return Err(Error::protocol(format!(
            "searchd response too large: {len} bytes"
        )));
    }
    let mut body = vec![0u8; len];
    stream
        .read_exact(&mut body)
        .map_err(|err| Error::io("failed to read searchd response", err))?;
    Ok((header, body))
}

/// Applies the reply status word. Errors and retries become
/// `Error::Daemon`; a warning is split off the front of the body.
pub fn process_reply(header: ReplyHeader, body: Vec<u8>, client_version: u16) -> Result<Reply> {
    let status = ReplyStatus::from_code(u32::from(header.status)).ok_or_else(|| {
        Error::protocol(format!("unknown status code '{}'", header.status))
    })?;
    let mut warning = None;
    let body = match status {
        ReplyStatus::Ok => body,
        ReplyStatus::Warning => {
            let mut dec = Decoder::new(&body);
            warning = Some(dec.get_str()?);
            dec.rest().to_vec()
        }
        ReplyStatus::Error => {
            let msg = Decoder::new(&body).get_str()?;
            return Err(Error::Daemon(format!("searchd error: {msg}")));
        }
        ReplyStatus::Retry => {
            let msg = Decoder::new(&body).get_str()?;
            return Err(Error::Daemon(format!("temporary searchd error: {msg}")));
        }
    };
    if header.version < client_version {
        let notice = format!(
            "searchd command v.{} older than client's v.{}, some options might not work",
            version_label(header.version),
            version_label(client_version)
        );
        warning = Some(match warning {
            Some(daemon) => format!("{daemon}; {notice}"),
            None => notice,
        });
    }
    Ok(Reply { body, warning })
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;
    use crate::codec::Encoder;

    fn header(status: u16, version: u16, body: &[u8]) -> ReplyHeader {
        ReplyHeader {
            status,
            version,
            len: body.len() as u32,
        }
    }

    fn string_body(msg: &str) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.put_str(msg);
        enc.into_inner()
    }

    #[test]
    fn endpoint_parsing() {
        assert_eq!(
            Endpoint::parse("db1", 9313).unwrap(),
            Endpoint::Tcp {
                host: "db1".into(),
                port: 9313
            }
        );
        assert_eq!(
            Endpoint::parse("/tmp/searchd.sock", 0).unwrap(),
            Endpoint::Unix("/tmp/searchd.sock".into())
        );
        assert_eq!(
            Endpoint::parse("unix:///var/run/searchd.sock", 0).unwrap(),
            Endpoint::Unix("/var/run/searchd.sock".into())
        );
        assert!(Endpoint::parse("", 9312).is_err());
        assert!(Endpoint::parse("db1", 0).is_err());
        assert_eq!(Endpoint::default().to_string(), "localhost:9312");
    }

    #[test]
    fn ok_reply_passes_body_through() {
        let reply = process_reply(header(0, 0x119, b"abcd"), b"abcd".to_vec(), 0x119).unwrap();
        assert_eq!(reply.body, b"abcd");
        assert_eq!(reply.warning, None);
    }

    #[test]
    fn warning_is_split_off() {
        let mut body = string_body("slow disk");
        body.extend_from_slice(&[0, 0, 0, 9]);
        let reply = process_reply(header(3, 0x100, &body), body, 0x100).unwrap();
        assert_eq!(reply.warning.as_deref(), Some("slow disk"));
        assert_eq!(reply.body, vec![0, 0, 0, 9]);
    }

    #[test]
    fn error_and_retry_statuses_fail() {
        let body = string_body("index 'x' not found");
        let err = process_reply(header(1, 0x100, &body), body.clone(), 0x100).unwrap_err();
        assert_eq!(err.to_string(), "searchd error: index 'x' not found");
        let err = process_reply(header(2, 0x100, &body), body, 0x100).unwrap_err();
        assert_eq!(err.to_string(), "temporary searchd error: index 'x' not found");
    }

    #[test]
    fn unknown_status_is_protocol_error() {
        let err = process_reply(header(9, 0x100, b"x"), b"x".to_vec(), 0x100).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.to_string().contains("unknown status code"));
    }

    #[test]
    fn older_daemon_version_warns() {
        let reply = process_reply(header(0, 0x116, b"z"), b"z".to_vec(), 0x119).unwrap();
        assert_eq!(
            reply.warning.as_deref(),
            Some("searchd command v.1.22 older than client's v.1.25, some options might not work")
        );
    }

    #[test]
    fn version_notice_keeps_daemon_warning() {
        let body = string_body("slow disk");
        let reply = process_reply(header(3, 0x116, &body), body, 0x119).unwrap();
        assert_eq!(
            reply.warning.as_deref(),
            Some(
                "slow disk; searchd command v.1.22 older than client's v.1.25, \
                 some options might not work"
            )
        );
    }

    #[test]
    fn connect_failure_reports_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let mut t = Transport::new(Endpoint::parse("127.0.0.1", port).unwrap());
        t.set_retries(1, Duration::from_millis(1));
        let err = t.request(Command::Status, 0x100, &[0, 0, 0, 1]).unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
        assert_eq!(t.state(), ConnState::Faulted);
    }

    #[test]
    fn close_without_open_fails() {
        let mut t = Transport::default();
        assert!(t.close().is_err());
        assert_eq!(t.state(), ConnState::Unopened);
    }
}
