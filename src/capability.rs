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

//! Daemon feature flags.
//!
//! Older daemons reject or misparse requests that carry newer sections, so
//! every optional wire feature is switched on explicitly here and consulted
//! by the encoders and the decoder.

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// STRING attributes in search replies.
    pub string_attrs: bool,
    /// Per-attribute MVA flag in update requests.
    pub mva_updates: bool,
    /// Ranker expressions (`RankingMode::Expr`).
    pub rank_expr: bool,
    /// Per-query attribute overrides.
    pub overrides: bool,
    /// `open()`/`close()` persistent connections.
    pub persistent: bool,
    pub status: bool,
    /// Select clause.
    pub select: bool,
    /// String equality filters.
    pub string_filters: bool,
    /// Passage limits, html stripping and passage boundaries in excerpts.
    pub extended_excerpts: bool,
    pub flush_attrs: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            string_attrs: true,
            mva_updates: true,
            rank_expr: true,
            overrides: true,
            persistent: true,
            status: true,
            select: true,
            string_filters: true,
            extended_excerpts: true,
            flush_attrs: true,
        }
    }

    /// Feature set of a 0.9.9 daemon: overrides and select only.
    pub fn legacy() -> Self {
        Self {
            string_attrs: false,
            mva_updates: false,
            rank_expr: false,
            overrides: true,
            persistent: false,
            status: false,
            select: true,
            string_filters: false,
            extended_excerpts: false,
            flush_attrs: false,
        }
    }

    pub fn search_version(&self) -> u16 {
        if self.rank_expr || self.string_filters {
            0x119
        } else if self.string_attrs {
            0x117
        } else {
            0x116
        }
    }

    pub fn excerpt_version(&self) -> u16 {
        if self.extended_excerpts { 0x102 } else { 0x100 }
    }

    pub fn update_version(&self) -> u16 {
        if self.mva_updates { 0x102 } else { 0x101 }
    }

    pub fn keywords_version(&self) -> u16 {
        0x100
    }

    pub fn status_version(&self) -> u16 {
        0x100
    }

    pub fn flush_version(&self) -> u16 {
        0x100
    }

    /// Fails with `Error::Unsupported` when `enabled` is false.
    pub(crate) fn require(enabled: bool, feature: &'static str) -> Result<()> {
        if enabled {
            Ok(())
        } else {
            Err(Error::Unsupported(feature))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_follow_flags() {
        assert_eq!(Capabilities::all().search_version(), 0x119);
        assert_eq!(Capabilities::legacy().search_version(), 0x116);
        let mut caps = Capabilities::legacy();
        caps.string_attrs = true;
        assert_eq!(caps.search_version(), 0x117);
        assert_eq!(Capabilities::legacy().excerpt_version(), 0x100);
        assert_eq!(Capabilities::all().update_version(), 0x102);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let caps: Capabilities = toml::from_str("status = false").unwrap();
        assert!(!caps.status);
        assert!(caps.string_attrs);
    }

    #[test]
    fn require_reports_feature() {
        let err = Capabilities::require(false, "select clause").unwrap_err();
        assert!(matches!(err, Error::Unsupported("select clause")));
        assert!(Capabilities::require(true, "select clause").is_ok());
    }
}
