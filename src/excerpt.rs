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

//! Snippet building (`build_excerpts`).

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::capability::Capabilities;
use crate::codec::Decoder;
use crate::codec::Encoder;
use crate::error::Error;
use crate::error::Result;

const FLAG_REMOVE_SPACES: u32 = 1;
const FLAG_EXACT_PHRASE: u32 = 2;
const FLAG_SINGLE_PASSAGE: u32 = 4;
const FLAG_USE_BOUNDARIES: u32 = 8;
const FLAG_WEIGHT_ORDER: u32 = 16;
const FLAG_QUERY_MODE: u32 = 32;
const FLAG_FORCE_ALL_WORDS: u32 = 64;
const FLAG_LOAD_FILES: u32 = 128;
const FLAG_ALLOW_EMPTY: u32 = 256;
const FLAG_EMIT_ZONES: u32 = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcerptOptions {
    pub before_match: String,
    pub after_match: String,
    pub chunk_separator: String,
    /// Maximum snippet size in characters.
    pub limit: u32,
    /// Words kept around each match.
    pub around: u32,
    pub limit_passages: u32,
    pub limit_words: u32,
    pub start_passage_id: u32,
    pub html_strip_mode: String,
    pub passage_boundary: String,
    pub exact_phrase: bool,
    pub single_passage: bool,
    pub use_boundaries: bool,
    pub weight_order: bool,
    pub query_mode: bool,
    pub force_all_words: bool,
    pub load_files: bool,
    pub allow_empty: bool,
    pub emit_zones: bool,
}

impl Default for ExcerptOptions {
    fn default() -> Self {
        Self {
            before_match: "<b>".to_string(),
            after_match: "</b>".to_string(),
            chunk_separator: " ... ".to_string(),
            limit: 256,
            around: 5,
            limit_passages: 0,
            limit_words: 0,
            start_passage_id: 1,
            html_strip_mode: "index".to_string(),
            passage_boundary: "none".to_string(),
            exact_phrase: false,
            single_passage: false,
            use_boundaries: false,
            weight_order: false,
            query_mode: false,
            force_all_words: false,
            load_files: false,
            allow_empty: false,
            emit_zones: false,
        }
    }
}

impl ExcerptOptions {
    /// Builds options from a loosely typed map.
    ///
    /// Strings, integers and booleans are converted to each option's type.
    /// Unknown keys and other value types (floats, arrays, objects, null)
    /// are skipped.
    pub fn from_json(map: &Map<String, Value>) -> Self {
        let mut opts = Self::default();
        for (key, value) in map {
            if !matches!(value, Value::String(_) | Value::Bool(_))
                && !value.is_i64()
                && !value.is_u64()
            {
                continue;
            }
            match key.as_str() {
                "before_match" => opts.before_match = as_text(value),
                "after_match" => opts.after_match = as_text(value),
                "chunk_separator" => opts.chunk_separator = as_text(value),
                "html_strip_mode" => opts.html_strip_mode = as_text(value),
                "passage_boundary" => opts.passage_boundary = as_text(value),
                "limit" => opts.limit = as_count(value),
                "around" => opts.around = as_count(value),
                "limit_passages" => opts.limit_passages = as_count(value),
                "limit_words" => opts.limit_words = as_count(value),
                "start_passage_id" => opts.start_passage_id = as_count(value),
                "exact_phrase" => opts.exact_phrase = as_flag(value),
                "single_passage" => opts.single_passage = as_flag(value),
                "use_boundaries" => opts.use_boundaries = as_flag(value),
                "weight_order" => opts.weight_order = as_flag(value),
                "query_mode" => opts.query_mode = as_flag(value),
                "force_all_words" => opts.force_all_words = as_flag(value),
                "load_files" => opts.load_files = as_flag(value),
                "allow_empty" => opts.allow_empty = as_flag(value),
                "emit_zones" => opts.emit_zones = as_flag(value),
                _ => {}
            }
        }
        opts
    }

    pub fn flags(&self) -> u32 {
        [
            (self.exact_phrase, FLAG_EXACT_PHRASE),
            (self.single_passage, FLAG_SINGLE_PASSAGE),
            (self.use_boundaries, FLAG_USE_BOUNDARIES),
            (self.weight_order, FLAG_WEIGHT_ORDER),
            (self.query_mode, FLAG_QUERY_MODE),
            (self.force_all_words, FLAG_FORCE_ALL_WORDS),
            (self.load_files, FLAG_LOAD_FILES),
            (self.allow_empty, FLAG_ALLOW_EMPTY),
            (self.emit_zones, FLAG_EMIT_ZONES),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(FLAG_REMOVE_SPACES, |acc, (_, bit)| acc | bit)
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

/// Negative numbers clamp to zero; strings use their leading digits.
fn as_count(value: &Value) -> u32 {
    let n = match value {
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => leading_int(s),
        other => other
            .as_i64()
            .unwrap_or_else(|| other.as_u64().map_or(0, |v| v.min(i64::MAX as u64) as i64)),
    };
    n.clamp(0, i64::from(u32::MAX)) as u32
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => !(s.is_empty() || s == "0"),
        other => other.as_i64().is_none_or(|n| n != 0),
    }
}

pub fn encode_excerpt_request(
    docs: &[String],
    index: &str,
    words: &str,
    opts: &ExcerptOptions,
    caps: &Capabilities,
) -> Result<Vec<u8>> {
    if docs.is_empty() {
        return Err(Error::invalid("empty documents array passed"));
    }
    if index.is_empty() {
        return Err(Error::invalid("index must not be empty"));
    }
    let mut enc = Encoder::new();
    enc.put_u32(0)
        .put_u32(opts.flags())
        .put_str(index)
        .put_str(words)
        .put_str(&opts.before_match)
        .put_str(&opts.after_match)
        .put_str(&opts.chunk_separator)
        .put_u32(opts.limit)
        .put_u32(opts.around);
    if caps.extended_excerpts {
        enc.put_u32(opts.limit_passages)
            .put_u32(opts.limit_words)
            .put_u32(opts.start_passage_id)
            .put_str(&opts.html_strip_mode)
            .put_str(&opts.passage_boundary);
    }
    enc.put_len(docs.len());
    for doc in docs {
        enc.put_str(doc);
    }
    Ok(enc.into_inner())
}

/// One snippet per requested document, in request order.
pub fn decode_excerpt_reply(body: &[u8], docs: usize) -> Result<Vec<String>> {
    let mut dec = Decoder::new(body);
    (0..docs).map(|_| dec.get_str()).collect()
}
