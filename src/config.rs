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

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use sphinx_client::Capabilities;
use sphinx_client::MatchMode;
use sphinx_client::RankingMode;
use sphinx_client::SphinxClient;

use crate::cli::ServerArgs;

const MAX_RETRIES: u32 = 1000;
const MAX_RETRY_DELAY_MS: u32 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub socket: Option<PathBuf>,
    /// Seconds per connection attempt.
    pub connect_timeout: f64,
    pub retries: u32,
    pub retry_delay_ms: u32,
    pub array_result: bool,
    pub match_mode: MatchMode,
    pub ranking_mode: RankingMode,
    pub log_level: String,
    pub capabilities: Capabilities,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9312,
            socket: None,
            connect_timeout: 1.0,
            retries: 0,
            retry_delay_ms: 0,
            array_result: false,
            match_mode: MatchMode::All,
            ranking_mode: RankingMode::ProximityBm25,
            log_level: "warn".to_string(),
            capabilities: Capabilities::default(),
        }
    }
}

impl Config {
    /// Builds a session from the file settings, with command-line server
    /// flags taking precedence.
    pub fn client(&self, server: &ServerArgs) -> Result<SphinxClient> {
        let mut client = SphinxClient::with_capabilities(self.capabilities);
        let socket = server
            .socket
            .as_ref()
            .or(if server.host.is_some() { None } else { self.socket.as_ref() });
        match socket {
            Some(path) => client.set_socket(path.clone())?,
            None => {
                let host = server.host.as_deref().unwrap_or(&self.host);
                let port = server.port.unwrap_or(self.port);
                client.set_server(host, port)?;
            }
        }
        client.set_connect_timeout(self.connect_timeout)?;
        client.set_retries(self.retries, self.retry_delay_ms)?;
        client.set_array_result(self.array_result);
        client.set_match_mode(self.match_mode)?;
        if self.ranking_mode != RankingMode::Expr {
            client.set_ranking_mode(self.ranking_mode, None)?;
        }
        Ok(client)
    }
}

/// Per-user config directory, resolved through `var` so lookups can be
/// substituted.
fn config_dir(var: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        return var("APPDATA").map(PathBuf::from).or_else(|| {
            var("USERPROFILE").map(|p| PathBuf::from(p).join("AppData").join("Roaming"))
        });
    }
    let home = var("HOME").map(PathBuf::from);
    if cfg!(target_os = "macos") {
        return home.map(|h| h.join("Library").join("Application Support"));
    }
    var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| home.map(|h| h.join(".config")))
}

pub fn global_config_path() -> Option<PathBuf> {
    config_dir(|key| std::env::var(key).ok()).map(|dir| dir.join("sphinx").join("sphinx.toml"))
}

/// Loads `explicit` when given (it must exist), else the global file when
/// present, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => read_config(path),
        None => load_global(global_config_path().as_deref()),
    }
}

fn load_global(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if path.exists() => read_config(path),
        _ => Ok(Config::default()),
    }
}

pub fn read_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut config: Config =
        toml::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    if !config.connect_timeout.is_finite() || config.connect_timeout < 0.0 {
        config.connect_timeout = Config::default().connect_timeout;
    }
    if config.port == 0 {
        config.port = Config::default().port;
    }
    config.retries = config.retries.min(MAX_RETRIES);
    config.retry_delay_ms = config.retry_delay_ms.min(MAX_RETRY_DELAY_MS);
    if config.ranking_mode == RankingMode::Expr {
        // no expression can be configured alongside the ranker
        config.ranking_mode = RankingMode::ProximityBm25;
    }
    Ok(config)
}
