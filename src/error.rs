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

//! Error type shared by the codec, transport and client session.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Argument rejected before any network I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Feature disabled by the session's capability flags.
    #[error("{0} is not supported by the configured daemon capabilities")]
    Unsupported(&'static str),

    #[error("connection to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Malformed, truncated or unexpected bytes from the daemon.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The daemon answered with an error or retry status.
    #[error("{0}")]
    Daemon(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Error::Io { context, source }
    }

    /// True for failures raised before anything was sent to the daemon.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::InvalidArgument(_) | Error::Unsupported(_))
    }
}
