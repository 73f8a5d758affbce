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

//! Query builder state and the search request encoding.
//!
//! Setters validate their input and mutate a template descriptor. Queuing a
//! query clones the template, so later setter calls never reach into a
//! query that is already waiting in a batch.

use crate::capability::Capabilities;
use crate::codec::Decoder;
use crate::codec::Encoder;
use crate::error::Error;
use crate::error::Result;
use crate::model::AttrType;
use crate::model::AttrValue;
use crate::model::GroupFunc;
use crate::model::MatchMode;
use crate::model::RankingMode;
use crate::model::SortMode;

pub const DEFAULT_MAX_MATCHES: u32 = 1000;
pub const DEFAULT_LIMIT: u32 = 20;
pub const DEFAULT_GROUP_SORT: &str = "@group desc";
pub const DEFAULT_INDEX: &str = "*";

const FILTER_VALUES: u32 = 0;
const FILTER_RANGE: u32 = 1;
const FILTER_FLOAT_RANGE: u32 = 2;
const FILTER_STRING: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    Values(Vec<i64>),
    Range { min: i64, max: i64 },
    FloatRange { min: f32, max: f32 },
    String(String),
}

impl FilterKind {
    fn code(&self) -> u32 {
        match self {
            FilterKind::Values(_) => FILTER_VALUES,
            FilterKind::Range { .. } => FILTER_RANGE,
            FilterKind::FloatRange { .. } => FILTER_FLOAT_RANGE,
            FilterKind::String(_) => FILTER_STRING,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub attr: String,
    pub kind: FilterKind,
    pub exclude: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoAnchor {
    pub lat_attr: String,
    pub long_attr: String,
    /// Radians.
    pub lat: f32,
    pub long: f32,
}

/// Per-document attribute values substituted for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrOverride {
    pub attr: String,
    pub attr_type: AttrType,
    pub values: Vec<(u64, AttrValue)>,
}

/// Key of a weight map entry. Only names are meaningful to the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightKey {
    Name(String),
    Position(u64),
}

impl From<&str> for WeightKey {
    fn from(value: &str) -> Self {
        WeightKey::Name(value.to_string())
    }
}

impl From<String> for WeightKey {
    fn from(value: String) -> Self {
        WeightKey::Name(value)
    }
}

impl From<&String> for WeightKey {
    fn from(value: &String) -> Self {
        WeightKey::Name(value.clone())
    }
}

impl From<u64> for WeightKey {
    fn from(value: u64) -> Self {
        WeightKey::Position(value)
    }
}

impl From<usize> for WeightKey {
    fn from(value: usize) -> Self {
        WeightKey::Position(value as u64)
    }
}

/// Everything the daemon needs to run one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub query: String,
    pub indexes: String,
    pub comment: String,
    pub offset: u32,
    pub limit: u32,
    pub max_matches: u32,
    pub cutoff: u32,
    pub match_mode: MatchMode,
    pub ranking_mode: RankingMode,
    pub rank_expr: String,
    pub sort_mode: SortMode,
    pub sort_by: String,
    pub min_id: u64,
    pub max_id: u64,
    pub filters: Vec<Filter>,
    pub group_func: GroupFunc,
    pub group_by: String,
    pub group_sort: String,
    pub group_distinct: String,
    pub retry_count: u32,
    pub retry_delay: u32,
    pub anchor: Option<GeoAnchor>,
    pub index_weights: Vec<(String, u32)>,
    pub max_query_time: u32,
    pub field_weights: Vec<(String, u32)>,
    pub overrides: Vec<AttrOverride>,
    pub select: String,
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self {
            query: String::new(),
            indexes: DEFAULT_INDEX.to_string(),
            comment: String::new(),
            offset: 0,
            limit: DEFAULT_LIMIT,
            max_matches: DEFAULT_MAX_MATCHES,
            cutoff: 0,
            match_mode: MatchMode::All,
            ranking_mode: RankingMode::ProximityBm25,
            rank_expr: String::new(),
            sort_mode: SortMode::Relevance,
            sort_by: String::new(),
            min_id: 0,
            max_id: 0,
            filters: Vec::new(),
            group_func: GroupFunc::Day,
            group_by: String::new(),
            group_sort: DEFAULT_GROUP_SORT.to_string(),
            group_distinct: String::new(),
            retry_count: 0,
            retry_delay: 0,
            anchor: None,
            index_weights: Vec::new(),
            max_query_time: 0,
            field_weights: Vec::new(),
            overrides: Vec::new(),
            select: "*".to_string(),
        }
    }
}

impl QueryDescriptor {
    pub fn encode(&self, enc: &mut Encoder, caps: &Capabilities) -> Result<()> {
        enc.put_u32(self.offset)
            .put_u32(self.limit)
            .put_u32(self.match_mode.code())
            .put_u32(self.ranking_mode.code());
        if caps.rank_expr && self.ranking_mode == RankingMode::Expr {
            enc.put_str(&self.rank_expr);
        }
        enc.put_u32(self.sort_mode.code())
            .put_str(&self.sort_by)
            .put_str(&self.query);
        // legacy positional weights, superseded by field weights
        enc.put_u32(0);
        enc.put_str(&self.indexes);
        // 64-bit id range marker
        enc.put_u32(1).put_u64(self.min_id).put_u64(self.max_id);

        enc.put_len(self.filters.len());
        for filter in &self.filters {
            enc.put_str(&filter.attr).put_u32(filter.kind.code());
            match &filter.kind {
                FilterKind::Values(values) => {
                    enc.put_len(values.len());
                    for v in values {
                        enc.put_i64(*v);
                    }
                }
                FilterKind::Range { min, max } => {
                    enc.put_i64(*min).put_i64(*max);
                }
                FilterKind::FloatRange { min, max } => {
                    enc.put_f32(*min).put_f32(*max);
                }
                FilterKind::String(value) => {
                    Capabilities::require(caps.string_filters, "string filter")?;
                    enc.put_str(value);
                }
            }
            enc.put_bool(filter.exclude);
        }

        enc.put_u32(self.group_func.code())
            .put_str(&self.group_by)
            .put_u32(self.max_matches)
            .put_str(&self.group_sort)
            .put_u32(self.cutoff)
            .put_u32(self.retry_count)
            .put_u32(self.retry_delay)
            .put_str(&self.group_distinct);

        match &self.anchor {
            None => {
                enc.put_u32(0);
            }
            Some(anchor) => {
                enc.put_u32(1)
                    .put_str(&anchor.lat_attr)
                    .put_str(&anchor.long_attr)
                    .put_f32(anchor.lat)
                    .put_f32(anchor.long);
            }
        }

        enc.put_len(self.index_weights.len());
        for (name, weight) in &self.index_weights {
            enc.put_str(name).put_u32(*weight);
        }
        enc.put_u32(self.max_query_time);
        enc.put_len(self.field_weights.len());
        for (name, weight) in &self.field_weights {
            enc.put_str(name).put_u32(*weight);
        }
        enc.put_str(&self.comment);

        if !self.overrides.is_empty() {
            Capabilities::require(caps.overrides, "attribute override")?;
        }
        enc.put_len(self.overrides.len());
        for ov in &self.overrides {
            enc.put_str(&ov.attr)
                .put_u32(ov.attr_type.code())
                .put_len(ov.values.len());
            for (id, value) in &ov.values {
                enc.put_u64(*id);
                encode_override_value(enc, ov.attr_type, value)?;
            }
        }

        let select = if caps.select { self.select.as_str() } else { "" };
        enc.put_str(select);
        Ok(())
    }

    /// Parses one query the way the daemon reads it. Used by test harnesses
    /// and request inspection; the client itself only encodes.
    pub fn decode(dec: &mut Decoder<'_>, caps: &Capabilities) -> Result<Self> {
        let mut q = QueryDescriptor {
            offset: dec.get_u32()?,
            limit: dec.get_u32()?,
            match_mode: enum_field(dec.get_u32()?, MatchMode::from_code, "match mode")?,
            ranking_mode: enum_field(dec.get_u32()?, RankingMode::from_code, "ranker")?,
            ..Default::default()
        };
        if caps.rank_expr && q.ranking_mode == RankingMode::Expr {
            q.rank_expr = dec.get_str()?;
        }
        q.sort_mode = enum_field(dec.get_u32()?, SortMode::from_code, "sort mode")?;
        q.sort_by = dec.get_str()?;
        q.query = dec.get_str()?;
        let legacy_weights = dec.get_count(4)?;
        for _ in 0..legacy_weights {
            dec.get_u32()?;
        }
        q.indexes = dec.get_str()?;
        if dec.get_u32()? != 1 {
            return Err(Error::protocol("expected 64-bit id range marker"));
        }
        q.min_id = dec.get_u64()?;
        q.max_id = dec.get_u64()?;

        let nfilters = dec.get_count(12)?;
        for _ in 0..nfilters {
            let attr = dec.get_str()?;
            let kind = match dec.get_u32()? {
                FILTER_VALUES => {
                    let n = dec.get_count(8)?;
                    let mut values = Vec::with_capacity(n);
                    for _ in 0..n {
                        values.push(dec.get_i64()?);
                    }
                    FilterKind::Values(values)
                }
                FILTER_RANGE => FilterKind::Range {
                    min: dec.get_i64()?,
                    max: dec.get_i64()?,
                },
                FILTER_FLOAT_RANGE => FilterKind::FloatRange {
                    min: dec.get_f32()?,
                    max: dec.get_f32()?,
                },
                FILTER_STRING if caps.string_filters => FilterKind::String(dec.get_str()?),
                other => return Err(Error::protocol(format!("unknown filter type {other}"))),
            };
            let exclude = dec.get_bool()?;
            q.filters.push(Filter {
                attr,
                kind,
                exclude,
            });
        }

        q.group_func = enum_field(dec.get_u32()?, GroupFunc::from_code, "group-by function")?;
        q.group_by = dec.get_str()?;
        q.max_matches = dec.get_u32()?;
        q.group_sort = dec.get_str()?;
        q.cutoff = dec.get_u32()?;
        q.retry_count = dec.get_u32()?;
        q.retry_delay = dec.get_u32()?;
        q.group_distinct = dec.get_str()?;

        if dec.get_bool()? {
            q.anchor = Some(GeoAnchor {
                lat_attr: dec.get_str()?,
                long_attr: dec.get_str()?,
                lat: dec.get_f32()?,
                long: dec.get_f32()?,
            });
        }

        let n = dec.get_count(8)?;
        for _ in 0..n {
            q.index_weights.push((dec.get_str()?, dec.get_u32()?));
        }
        q.max_query_time = dec.get_u32()?;
        let n = dec.get_count(8)?;
        for _ in 0..n {
            q.field_weights.push((dec.get_str()?, dec.get_u32()?));
        }
        q.comment = dec.get_str()?;

        let n = dec.get_count(12)?;
        for _ in 0..n {
            let attr = dec.get_str()?;
            let attr_type = AttrType::from_code(dec.get_u32()?);
            let count = dec.get_count(12)?;
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let id = dec.get_u64()?;
                let value = match attr_type {
                    AttrType::Float => AttrValue::Float(dec.get_f32()?),
                    AttrType::BigInt => AttrValue::Integer(dec.get_i64()?),
                    _ => AttrValue::Integer(i64::from(dec.get_u32()?)),
                };
                values.push((id, value));
            }
            q.overrides.push(AttrOverride {
                attr,
                attr_type,
                values,
            });
        }

        q.select = dec.get_str()?;
        Ok(q)
    }
}

fn encode_override_value(enc: &mut Encoder, attr_type: AttrType, value: &AttrValue) -> Result<()> {
    match (attr_type, value) {
        (AttrType::Float, AttrValue::Float(v)) => {
            enc.put_f32(*v);
        }
        (AttrType::BigInt, AttrValue::Integer(v)) => {
            enc.put_i64(*v);
        }
        (AttrType::Integer | AttrType::Timestamp | AttrType::Bool, AttrValue::Integer(v)) => {
            let v = u32::try_from(*v).map_err(|_| {
                Error::invalid(format!("override value {v} does not fit a 32-bit attribute"))
            })?;
            enc.put_u32(v);
        }
        (t, v) => {
            return Err(Error::invalid(format!(
                "override value {v:?} does not fit attribute type {}",
                t.code()
            )));
        }
    }
    Ok(())
}

fn enum_field<T>(code: u32, parse: fn(u32) -> Option<T>, what: &str) -> Result<T> {
    parse(code).ok_or_else(|| Error::protocol(format!("unknown {what} code {code}")))
}

/// Search request body for a batch of queries.
pub fn encode_search_request(queries: &[QueryDescriptor], caps: &Capabilities) -> Result<Vec<u8>> {
    if queries.is_empty() {
        return Err(Error::invalid("no queries to run"));
    }
    let mut enc = Encoder::new();
    // master/agent flag; always 0 from a client
    enc.put_u32(0).put_len(queries.len());
    for q in queries {
        q.encode(&mut enc, caps)?;
    }
    Ok(enc.into_inner())
}

pub fn decode_search_request(body: &[u8], caps: &Capabilities) -> Result<Vec<QueryDescriptor>> {
    let mut dec = Decoder::new(body);
    let _master = dec.get_u32()?;
    let n = dec.get_count(1)?;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(QueryDescriptor::decode(&mut dec, caps)?);
    }
    if !dec.is_empty() {
        return Err(Error::protocol(format!(
            "{} trailing bytes after search request",
            dec.remaining()
        )));
    }
    Ok(out)
}

/// Mutable search settings of a session.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    template: QueryDescriptor,
    caps: Capabilities,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

impl QueryBuilder {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            template: QueryDescriptor::default(),
            caps,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn set_capabilities(&mut self, caps: Capabilities) {
        self.caps = caps;
    }

    /// Current settings, with empty query text.
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.template
    }

    pub fn filters(&self) -> &[Filter] {
        &self.template.filters
    }

    /// Freezes the current settings into a descriptor for `query`.
    pub fn snapshot(&self, query: &str, indexes: &str, comment: &str) -> QueryDescriptor {
        let mut q = self.template.clone();
        q.query = query.to_string();
        q.indexes = indexes.to_string();
        q.comment = comment.to_string();
        q
    }

    pub fn set_limits(
        &mut self,
        offset: u32,
        limit: u32,
        max_matches: Option<u32>,
        cutoff: Option<u32>,
    ) -> Result<()> {
        if limit == 0 {
            return Err(Error::invalid("limit must be positive"));
        }
        if max_matches == Some(0) {
            return Err(Error::invalid("max_matches must be positive"));
        }
        let t = &mut self.template;
        t.offset = offset;
        t.limit = limit;
        t.max_matches = max_matches.unwrap_or(DEFAULT_MAX_MATCHES);
        t.cutoff = cutoff.unwrap_or(0);
        Ok(())
    }

    pub fn set_max_query_time(&mut self, millis: u32) -> Result<()> {
        if millis == 0 {
            return Err(Error::invalid("max query time must be positive"));
        }
        self.template.max_query_time = millis;
        Ok(())
    }

    pub fn set_match_mode(&mut self, mode: MatchMode) -> Result<()> {
        self.template.match_mode = mode;
        Ok(())
    }

    pub fn set_ranking_mode(&mut self, mode: RankingMode, expr: Option<&str>) -> Result<()> {
        let expr = expr.unwrap_or_default();
        if mode == RankingMode::Expr {
            Capabilities::require(self.caps.rank_expr, "ranking expression")?;
            if expr.is_empty() {
                return Err(Error::invalid("expression ranker requires an expression"));
            }
        }
        self.template.ranking_mode = mode;
        self.template.rank_expr = expr.to_string();
        Ok(())
    }

    pub fn set_sort_mode(&mut self, mode: SortMode, sort_by: Option<&str>) -> Result<()> {
        let sort_by = sort_by.unwrap_or_default();
        if mode != SortMode::Relevance && sort_by.is_empty() {
            return Err(Error::invalid(format!(
                "sort clause must not be empty in {mode} mode"
            )));
        }
        self.template.sort_mode = mode;
        self.template.sort_by = sort_by.to_string();
        Ok(())
    }

    /// Replaces the field weights; see [`named_weights`] for key handling.
    pub fn set_field_weights<I, K>(&mut self, weights: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<WeightKey>,
    {
        let weights = named_weights(weights, "field")?;
        let applied = weights.len();
        self.template.field_weights = weights;
        Ok(applied)
    }

    pub fn set_index_weights<I, K>(&mut self, weights: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<WeightKey>,
    {
        let weights = named_weights(weights, "index")?;
        let applied = weights.len();
        self.template.index_weights = weights;
        Ok(applied)
    }

    pub fn set_id_range(&mut self, min: u64, max: u64) -> Result<()> {
        if min > max {
            return Err(Error::invalid(format!("id range {min}..{max} is inverted")));
        }
        self.template.min_id = min;
        self.template.max_id = max;
        Ok(())
    }

    pub fn set_filter(&mut self, attr: &str, values: &[i64], exclude: bool) -> Result<()> {
        require_name(attr, "filter attribute")?;
        if values.is_empty() {
            return Err(Error::invalid(format!("filter on '{attr}' has no values")));
        }
        self.push_filter(attr, FilterKind::Values(values.to_vec()), exclude);
        Ok(())
    }

    pub fn set_filter_range(&mut self, attr: &str, min: i64, max: i64, exclude: bool) -> Result<()> {
        require_name(attr, "filter attribute")?;
        if min > max {
            return Err(Error::invalid(format!("range {min}..{max} on '{attr}' is inverted")));
        }
        self.push_filter(attr, FilterKind::Range { min, max }, exclude);
        Ok(())
    }

    pub fn set_filter_float_range(
        &mut self,
        attr: &str,
        min: f32,
        max: f32,
        exclude: bool,
    ) -> Result<()> {
        require_name(attr, "filter attribute")?;
        if min.is_nan() || max.is_nan() || min > max {
            return Err(Error::invalid(format!("range {min}..{max} on '{attr}' is invalid")));
        }
        self.push_filter(attr, FilterKind::FloatRange { min, max }, exclude);
        Ok(())
    }

    pub fn set_filter_string(&mut self, attr: &str, value: &str, exclude: bool) -> Result<()> {
        Capabilities::require(self.caps.string_filters, "string filter")?;
        require_name(attr, "filter attribute")?;
        self.push_filter(attr, FilterKind::String(value.to_string()), exclude);
        Ok(())
    }

    fn push_filter(&mut self, attr: &str, kind: FilterKind, exclude: bool) {
        self.template.filters.push(Filter {
            attr: attr.to_string(),
            kind,
            exclude,
        });
    }

    pub fn set_geo_anchor(&mut self, lat_attr: &str, long_attr: &str, lat: f32, long: f32) -> Result<()> {
        require_name(lat_attr, "latitude attribute")?;
        require_name(long_attr, "longitude attribute")?;
        self.template.anchor = Some(GeoAnchor {
            lat_attr: lat_attr.to_string(),
            long_attr: long_attr.to_string(),
            lat,
            long,
        });
        Ok(())
    }

    /// Groups matches by `attr`; the group sort defaults to `@group desc`.
    pub fn set_group_by(&mut self, attr: &str, func: GroupFunc, group_sort: Option<&str>) -> Result<()> {
        require_name(attr, "group-by attribute")?;
        let t = &mut self.template;
        t.group_by = attr.to_string();
        t.group_func = func;
        t.group_sort = group_sort.unwrap_or(DEFAULT_GROUP_SORT).to_string();
        Ok(())
    }

    pub fn set_group_distinct(&mut self, attr: &str) -> Result<()> {
        require_name(attr, "group distinct attribute")?;
        self.template.group_distinct = attr.to_string();
        Ok(())
    }

    pub fn set_retries(&mut self, count: u32, delay_ms: u32) -> Result<()> {
        if count > 1000 {
            return Err(Error::invalid(format!("retry count {count} exceeds 1000")));
        }
        if delay_ms > 100_000 {
            return Err(Error::invalid(format!("retry delay {delay_ms}ms exceeds 100000ms")));
        }
        self.template.retry_count = count;
        self.template.retry_delay = delay_ms;
        Ok(())
    }

    pub fn set_select(&mut self, clause: &str) -> Result<()> {
        Capabilities::require(self.caps.select, "select clause")?;
        self.template.select = clause.to_string();
        Ok(())
    }

    /// Sets per-document values for `attr`, replacing an earlier override
    /// of the same attribute.
    pub fn set_override<I>(&mut self, attr: &str, attr_type: AttrType, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (u64, AttrValue)>,
    {
        Capabilities::require(self.caps.overrides, "attribute override")?;
        require_name(attr, "override attribute")?;
        let values: Vec<(u64, AttrValue)> = values.into_iter().collect();
        if values.is_empty() {
            return Err(Error::invalid(format!("override on '{attr}' has no values")));
        }
        for (id, value) in &values {
            let fits = match attr_type {
                AttrType::Float => matches!(value, AttrValue::Float(_)),
                AttrType::Integer | AttrType::Timestamp | AttrType::Bool | AttrType::BigInt => {
                    matches!(value, AttrValue::Integer(_))
                }
                other => {
                    return Err(Error::invalid(format!(
                        "attribute type {} cannot be overridden",
                        other.code()
                    )));
                }
            };
            if !fits {
                return Err(Error::invalid(format!(
                    "override value for document {id} does not match attribute type"
                )));
            }
            if let (AttrType::Integer | AttrType::Timestamp | AttrType::Bool, AttrValue::Integer(v)) =
                (attr_type, value)
            {
                if u32::try_from(*v).is_err() {
                    return Err(Error::invalid(format!(
                        "override value {v} for document {id} does not fit a 32-bit attribute"
                    )));
                }
            }
        }
        let ov = AttrOverride {
            attr: attr.to_string(),
            attr_type,
            values,
        };
        let overrides = &mut self.template.overrides;
        match overrides.iter_mut().find(|o| o.attr == attr) {
            Some(existing) => *existing = ov,
            None => overrides.push(ov),
        }
        Ok(())
    }

    /// Drops all filters and the geo anchor.
    pub fn reset_filters(&mut self) {
        self.template.filters.clear();
        self.template.anchor = None;
    }

    pub fn reset_group_by(&mut self) {
        let t = &mut self.template;
        t.group_by.clear();
        t.group_func = GroupFunc::Day;
        t.group_sort = DEFAULT_GROUP_SORT.to_string();
        t.group_distinct.clear();
    }

    pub fn reset_overrides(&mut self) {
        self.template.overrides.clear();
    }
}

fn require_name(name: &str, what: &str) -> Result<()> {
    if name.is_empty() {
        Err(Error::invalid(format!("{what} must not be empty")))
    } else {
        Ok(())
    }
}

/// Collects name-keyed weights. Conversion stops at the first positional
/// key; the names before it are kept. Fails when nothing usable precedes it
/// or the input is empty.
pub fn named_weights<I, K>(weights: I, what: &str) -> Result<Vec<(String, u32)>>
where
    I: IntoIterator<Item = (K, u32)>,
    K: Into<WeightKey>,
{
    let mut out = Vec::new();
    let mut seen = false;
    for (key, weight) in weights {
        seen = true;
        match key.into() {
            WeightKey::Name(name) => {
                require_name(&name, &format!("{what} name"))?;
                out.push((name, weight));
            }
            WeightKey::Position(_) => break,
        }
    }
    if !seen {
        return Err(Error::invalid(format!("{what} weights are empty")));
    }
    if out.is_empty() {
        return Err(Error::invalid(format!("{what} weights require string keys")));
    }
    Ok(out)
}
