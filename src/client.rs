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

//! The client session.

use std::mem;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::capability::Capabilities;
use crate::codec::Command;
use crate::codec::Decoder;
use crate::decode::decode_search_reply;
use crate::error::Error;
use crate::error::Result;
use crate::escape;
use crate::excerpt::ExcerptOptions;
use crate::excerpt::decode_excerpt_reply;
use crate::excerpt::encode_excerpt_request;
use crate::keywords::decode_keywords_reply;
use crate::keywords::encode_keywords_request;
use crate::model::AttrType;
use crate::model::AttrValue;
use crate::model::GroupFunc;
use crate::model::KeywordInfo;
use crate::model::MatchMode;
use crate::model::RankingMode;
use crate::model::ResultRecord;
use crate::model::SortMode;
use crate::query::DEFAULT_INDEX;
use crate::query::QueryBuilder;
use crate::query::QueryDescriptor;
use crate::query::WeightKey;
use crate::query::encode_search_request;
use crate::transport::ConnState;
use crate::transport::Endpoint;
use crate::transport::Transport;
use crate::update::UpdateRequest;
use crate::update::decode_update_reply;

/// Most queries one batch may carry.
pub const MAX_QUERIES: usize = 32;

/// A session with one search daemon.
///
/// Setters validate eagerly and never touch the network. Every failure,
/// local or remote, is also kept in [`last_error`](Self::last_error); the
/// daemon's most recent warning is kept in
/// [`last_warning`](Self::last_warning).
#[derive(Debug, Default)]
pub struct SphinxClient {
    transport: Transport,
    builder: QueryBuilder,
    queue: Vec<QueryDescriptor>,
    array_result: bool,
    last_error: String,
    last_warning: String,
}

fn track<T>(slot: &mut String, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        *slot = err.to_string();
    }
    result
}

impl SphinxClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(caps: Capabilities) -> Self {
        let mut client = Self::new();
        client.set_capabilities(caps);
        client
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn last_warning(&self) -> &str {
        &self.last_warning
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.builder.capabilities()
    }

    pub fn set_capabilities(&mut self, caps: Capabilities) {
        self.builder.set_capabilities(caps);
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }

    pub fn connection_state(&self) -> ConnState {
        self.transport.state()
    }

    /// Search settings that the next `add_query` will capture.
    pub fn settings(&self) -> &QueryDescriptor {
        self.builder.descriptor()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn array_result(&self) -> bool {
        self.array_result
    }

    /// Chooses how matches are returned.
    ///
    /// When false (the default), matches are keyed by document id and two
    /// matches sharing an id collapse into one entry: the later match wins,
    /// keeping the earlier one's position. When true, matches are returned in
    /// daemon order with duplicates intact.
    pub fn set_array_result(&mut self, array_result: bool) {
        self.array_result = array_result;
    }

    pub fn set_server(&mut self, host: &str, port: u16) -> Result<()> {
        let endpoint = track(&mut self.last_error, Endpoint::parse(host, port))?;
        self.transport.set_endpoint(endpoint);
        Ok(())
    }

    pub fn set_socket(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let endpoint = track(&mut self.last_error, Endpoint::unix(path))?;
        self.transport.set_endpoint(endpoint);
        Ok(())
    }

    /// Timeout in seconds for each connection attempt; zero waits forever.
    pub fn set_connect_timeout(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return track(
                &mut self.last_error,
                Err(Error::invalid(format!("connect timeout {seconds} is invalid"))),
            );
        }
        self.transport
            .set_connect_timeout(Duration::from_secs_f64(seconds));
        Ok(())
    }

    /// Connection retries, also forwarded to the daemon for distributed
    /// queries.
    pub fn set_retries(&mut self, count: u32, delay_ms: u32) -> Result<()> {
        track(&mut self.last_error, self.builder.set_retries(count, delay_ms))?;
        self.transport
            .set_retries(count, Duration::from_millis(u64::from(delay_ms)));
        Ok(())
    }

    pub fn set_limits(
        &mut self,
        offset: u32,
        limit: u32,
        max_matches: Option<u32>,
        cutoff: Option<u32>,
    ) -> Result<()> {
        track(
            &mut self.last_error,
            self.builder.set_limits(offset, limit, max_matches, cutoff),
        )
    }

    pub fn set_max_query_time(&mut self, millis: u32) -> Result<()> {
        track(&mut self.last_error, self.builder.set_max_query_time(millis))
    }

    pub fn set_match_mode(&mut self, mode: MatchMode) -> Result<()> {
        track(&mut self.last_error, self.builder.set_match_mode(mode))
    }

    pub fn set_ranking_mode(&mut self, mode: RankingMode, expr: Option<&str>) -> Result<()> {
        track(&mut self.last_error, self.builder.set_ranking_mode(mode, expr))
    }

    pub fn set_sort_mode(&mut self, mode: SortMode, sort_by: Option<&str>) -> Result<()> {
        track(&mut self.last_error, self.builder.set_sort_mode(mode, sort_by))
    }

    pub fn set_field_weights<I, K>(&mut self, weights: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<WeightKey>,
    {
        track(&mut self.last_error, self.builder.set_field_weights(weights))
    }

    pub fn set_index_weights<I, K>(&mut self, weights: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<WeightKey>,
    {
        track(&mut self.last_error, self.builder.set_index_weights(weights))
    }

    pub fn set_id_range(&mut self, min: u64, max: u64) -> Result<()> {
        track(&mut self.last_error, self.builder.set_id_range(min, max))
    }

    pub fn set_filter(&mut self, attr: &str, values: &[i64], exclude: bool) -> Result<()> {
        track(&mut self.last_error, self.builder.set_filter(attr, values, exclude))
    }

    pub fn set_filter_range(&mut self, attr: &str, min: i64, max: i64, exclude: bool) -> Result<()> {
        track(
            &mut self.last_error,
            self.builder.set_filter_range(attr, min, max, exclude),
        )
    }

    pub fn set_filter_float_range(
        &mut self,
        attr: &str,
        min: f32,
        max: f32,
        exclude: bool,
    ) -> Result<()> {
        track(
            &mut self.last_error,
            self.builder.set_filter_float_range(attr, min, max, exclude),
        )
    }

    pub fn set_filter_string(&mut self, attr: &str, value: &str, exclude: bool) -> Result<()> {
        track(
            &mut self.last_error,
            self.builder.set_filter_string(attr, value, exclude),
        )
    }

    pub fn set_geo_anchor(&mut self, lat_attr: &str, long_attr: &str, lat: f32, long: f32) -> Result<()> {
        track(
            &mut self.last_error,
            self.builder.set_geo_anchor(lat_attr, long_attr, lat, long),
        )
    }

    pub fn set_group_by(&mut self, attr: &str, func: GroupFunc, group_sort: Option<&str>) -> Result<()> {
        track(
            &mut self.last_error,
            self.builder.set_group_by(attr, func, group_sort),
        )
    }

    pub fn set_group_distinct(&mut self, attr: &str) -> Result<()> {
        track(&mut self.last_error, self.builder.set_group_distinct(attr))
    }

    pub fn set_select(&mut self, clause: &str) -> Result<()> {
        track(&mut self.last_error, self.builder.set_select(clause))
    }

    pub fn set_override<I>(&mut self, attr: &str, attr_type: AttrType, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (u64, AttrValue)>,
    {
        track(
            &mut self.last_error,
            self.builder.set_override(attr, attr_type, values),
        )
    }

    pub fn reset_filters(&mut self) {
        self.builder.reset_filters();
    }

    pub fn reset_group_by(&mut self) {
        self.builder.reset_group_by();
    }

    pub fn reset_overrides(&mut self) {
        self.builder.reset_overrides();
    }

    /// Queues a query with the current settings and returns its position in
    /// the batch.
    pub fn add_query(&mut self, query: &str, index: Option<&str>, comment: Option<&str>) -> Result<usize> {
        if self.queue.len() >= MAX_QUERIES {
            return track(
                &mut self.last_error,
                Err(Error::invalid(format!("too many queries, at most {MAX_QUERIES} per batch"))),
            );
        }
        let q = self.builder.snapshot(
            query,
            index.unwrap_or(DEFAULT_INDEX),
            comment.unwrap_or_default(),
        );
        self.queue.push(q);
        Ok(self.queue.len() - 1)
    }

    /// Sends every queued query in one request. The queue is empty
    /// afterwards whatever the outcome.
    pub fn run_queries(&mut self) -> Result<Vec<ResultRecord>> {
        self.begin();
        let queue = mem::take(&mut self.queue);
        let result = self.run_batch(&queue);
        track(&mut self.last_error, result)
    }

    fn run_batch(&mut self, queue: &[QueryDescriptor]) -> Result<Vec<ResultRecord>> {
        if queue.is_empty() {
            return Err(Error::invalid("no queries defined, issue add_query() first"));
        }
        let caps = *self.capabilities();
        let body = encode_search_request(queue, &caps)?;
        debug!(queries = queue.len(), bytes = body.len(), "running batch");
        let reply = self.call(Command::Search, caps.search_version(), &body)?;
        decode_search_reply(&reply, queue.len(), &caps, self.array_result)
    }

    /// Runs a single query. Fails if other queries are already queued, or
    /// if the daemon reports an error for this query.
    pub fn query(&mut self, query: &str, index: Option<&str>, comment: Option<&str>) -> Result<ResultRecord> {
        if !self.queue.is_empty() {
            return track(
                &mut self.last_error,
                Err(Error::invalid(
                    "query() cannot be used while add_query() queries are pending",
                )),
            );
        }
        self.add_query(query, index, comment)?;
        let mut records = self.run_queries()?;
        let record = match records.pop() {
            Some(record) => record,
            None => {
                return track(
                    &mut self.last_error,
                    Err(Error::protocol("search reply carried no results")),
                );
            }
        };
        if record.is_error() {
            return track(&mut self.last_error, Err(Error::Daemon(record.error)));
        }
        if !record.warning.is_empty() {
            self.last_warning = record.warning.clone();
        }
        Ok(record)
    }

    pub fn build_excerpts(
        &mut self,
        docs: &[String],
        index: &str,
        words: &str,
        opts: &ExcerptOptions,
    ) -> Result<Vec<String>> {
        self.begin();
        let caps = *self.capabilities();
        let result = encode_excerpt_request(docs, index, words, opts, &caps)
            .and_then(|body| self.call(Command::Excerpt, caps.excerpt_version(), &body))
            .and_then(|reply| decode_excerpt_reply(&reply, docs.len()));
        track(&mut self.last_error, result)
    }

    pub fn build_keywords(&mut self, query: &str, index: &str, hits: bool) -> Result<Vec<KeywordInfo>> {
        self.begin();
        let version = self.capabilities().keywords_version();
        let result = encode_keywords_request(query, index, hits)
            .and_then(|body| self.call(Command::Keywords, version, &body))
            .and_then(|reply| decode_keywords_reply(&reply, hits));
        track(&mut self.last_error, result)
    }

    /// Updates integer attributes; returns how many documents were updated.
    pub fn update_attributes(
        &mut self,
        index: &str,
        attrs: &[String],
        values: &[(u64, Vec<u32>)],
    ) -> Result<u32> {
        self.begin();
        let result = UpdateRequest::plain(index, attrs, values).and_then(|req| self.send_update(&req));
        track(&mut self.last_error, result)
    }

    /// Replaces MVA attribute values, one request per document and
    /// attribute; returns the summed update count.
    pub fn update_attributes_mva(
        &mut self,
        index: &str,
        attrs: &[String],
        values: &[(u64, Vec<Vec<u32>>)],
    ) -> Result<u32> {
        self.begin();
        let caps = *self.capabilities();
        let result = UpdateRequest::multi(index, attrs, values, &caps).and_then(|reqs| {
            let mut updated = 0u32;
            for req in &reqs {
                updated = updated.saturating_add(self.send_update(req)?);
            }
            Ok(updated)
        });
        track(&mut self.last_error, result)
    }

    fn send_update(&mut self, req: &UpdateRequest) -> Result<u32> {
        let caps = *self.capabilities();
        let body = req.encode(&caps)?;
        let reply = self.call(Command::Update, caps.update_version(), &body)?;
        decode_update_reply(&reply)
    }

    /// Daemon status counters as rows of cells.
    pub fn status(&mut self) -> Result<Vec<Vec<String>>> {
        self.begin();
        let caps = *self.capabilities();
        let result = Capabilities::require(caps.status, "status")
            .and_then(|_| self.call(Command::Status, caps.status_version(), &1u32.to_be_bytes()))
            .and_then(|reply| decode_status_reply(&reply));
        track(&mut self.last_error, result)
    }

    /// Asks the daemon to write attributes to disk; returns its flush tag.
    pub fn flush_attributes(&mut self) -> Result<i32> {
        self.begin();
        let caps = *self.capabilities();
        let result = Capabilities::require(caps.flush_attrs, "attribute flush")
            .and_then(|_| self.call(Command::FlushAttrs, caps.flush_version(), &[]))
            .and_then(|reply| Decoder::new(&reply).get_u32().map(|tag| tag as i32));
        track(&mut self.last_error, result)
    }

    /// Opens a persistent connection used by every later request until
    /// [`close`](Self::close).
    pub fn open(&mut self) -> Result<()> {
        self.begin();
        let result = Capabilities::require(self.capabilities().persistent, "persistent connection")
            .and_then(|_| self.transport.open());
        track(&mut self.last_error, result)
    }

    pub fn close(&mut self) -> Result<()> {
        let result = self.transport.close();
        track(&mut self.last_error, result)
    }

    pub fn escape_string(&self, text: &str) -> String {
        escape::escape_string(text)
    }

    fn begin(&mut self) {
        self.last_error.clear();
        self.last_warning.clear();
    }

    fn call(&mut self, command: Command, version: u16, body: &[u8]) -> Result<Vec<u8>> {
        let reply = self.transport.request(command, version, body)?;
        if let Some(warning) = reply.warning {
            warn!(command = command.as_label(), %warning, "searchd warning");
            self.last_warning = warning;
        }
        Ok(reply.body)
    }
}

fn decode_status_reply(body: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut dec = Decoder::new(body);
    let rows = dec.get_u32()? as usize;
    let cols = dec.get_u32()? as usize;
    if cols == 0 || rows.saturating_mul(cols) > dec.remaining() / 4 {
        return Err(Error::protocol(format!(
            "status table {rows}x{cols} does not fit the reply"
        )));
    }
    (0..rows)
        .map(|_| (0..cols).map(|_| dec.get_str()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;

    #[test]
    fn setter_failures_are_recorded() {
        let mut c = SphinxClient::new();
        assert!(c.set_filter("group_id", &[], false).is_err());
        assert!(c.last_error().contains("has no values"));
        assert!(c.settings().filters.is_empty());
        c.set_filter("group_id", &[1], false).unwrap();
        assert_eq!(c.settings().filters.len(), 1);
    }

    #[test]
    fn empty_batch_fails_without_network() {
        let mut c = SphinxClient::new();
        c.set_server("127.0.0.1", 1).unwrap();
        let err = c.run_queries().unwrap_err();
        assert!(err.is_usage());
        assert_eq!(c.connection_state(), ConnState::Unopened);
        assert_eq!(c.last_error(), err.to_string());
    }

    #[test]
    fn queue_is_bounded() {
        let mut c = SphinxClient::new();
        for i in 0..MAX_QUERIES {
            assert_eq!(c.add_query("q", None, None).unwrap(), i);
        }
        assert!(c.add_query("q", None, None).is_err());
        assert_eq!(c.queued(), MAX_QUERIES);
    }

    #[test]
    fn query_refuses_pending_batch() {
        let mut c = SphinxClient::new();
        c.add_query("first", None, None).unwrap();
        let err = c.query("second", None, None).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(c.queued(), 1);
    }

    #[test]
    fn connect_timeout_must_be_finite() {
        let mut c = SphinxClient::new();
        assert!(c.set_connect_timeout(-1.0).is_err());
        assert!(c.set_connect_timeout(f64::NAN).is_err());
        c.set_connect_timeout(0.25).unwrap();
    }

    #[test]
    fn gated_operations_fail_before_io() {
        let mut c = SphinxClient::with_capabilities(Capabilities::legacy());
        c.set_server("127.0.0.1", 1).unwrap();
        assert!(matches!(c.status(), Err(Error::Unsupported(_))));
        assert!(matches!(c.open(), Err(Error::Unsupported(_))));
        assert!(matches!(c.flush_attributes(), Err(Error::Unsupported(_))));
        assert_eq!(c.connection_state(), ConnState::Unopened);
    }

    #[test]
    fn status_table_decodes() {
        let mut enc = Encoder::new();
        enc.put_u32(2).put_u32(2);
        enc.put_str("uptime").put_str("42").put_str("connections").put_str("7");
        let rows = decode_status_reply(enc.as_slice()).unwrap();
        assert_eq!(rows[1], vec!["connections".to_string(), "7".to_string()]);

        let mut enc = Encoder::new();
        enc.put_u32(1000).put_u32(2);
        assert!(decode_status_reply(enc.as_slice()).is_err());
    }

    #[test]
    fn escape_is_available_on_the_session() {
        assert_eq!(SphinxClient::new().escape_string("a|b"), r"a\|b");
    }
}
