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

//! Protocol enumerations and the result records handed back to callers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use serde::ser::SerializeSeq;
use serde::ser::SerializeStruct;

use crate::codec::ReplyStatus;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    All,
    Any,
    Phrase,
    Boolean,
    Extended,
    Fullscan,
    Extended2,
}

impl MatchMode {
    const ALL: [MatchMode; 7] = [
        MatchMode::All,
        MatchMode::Any,
        MatchMode::Phrase,
        MatchMode::Boolean,
        MatchMode::Extended,
        MatchMode::Fullscan,
        MatchMode::Extended2,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_label(self) -> &'static str {
        match self {
            MatchMode::All => "all",
            MatchMode::Any => "any",
            MatchMode::Phrase => "phrase",
            MatchMode::Boolean => "boolean",
            MatchMode::Extended => "extended",
            MatchMode::Fullscan => "fullscan",
            MatchMode::Extended2 => "extended2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    ProximityBm25,
    Bm25,
    None,
    WordCount,
    Proximity,
    MatchAny,
    FieldMask,
    Sph04,
    Expr,
}

impl RankingMode {
    const ALL: [RankingMode; 9] = [
        RankingMode::ProximityBm25,
        RankingMode::Bm25,
        RankingMode::None,
        RankingMode::WordCount,
        RankingMode::Proximity,
        RankingMode::MatchAny,
        RankingMode::FieldMask,
        RankingMode::Sph04,
        RankingMode::Expr,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_label(self) -> &'static str {
        match self {
            RankingMode::ProximityBm25 => "proximity_bm25",
            RankingMode::Bm25 => "bm25",
            RankingMode::None => "none",
            RankingMode::WordCount => "word_count",
            RankingMode::Proximity => "proximity",
            RankingMode::MatchAny => "match_any",
            RankingMode::FieldMask => "field_mask",
            RankingMode::Sph04 => "sph04",
            RankingMode::Expr => "expr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    Relevance,
    AttrDesc,
    AttrAsc,
    TimeSegments,
    Extended,
    Expr,
}

impl SortMode {
    const ALL: [SortMode; 6] = [
        SortMode::Relevance,
        SortMode::AttrDesc,
        SortMode::AttrAsc,
        SortMode::TimeSegments,
        SortMode::Extended,
        SortMode::Expr,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_label(self) -> &'static str {
        match self {
            SortMode::Relevance => "relevance",
            SortMode::AttrDesc => "attr_desc",
            SortMode::AttrAsc => "attr_asc",
            SortMode::TimeSegments => "time_segments",
            SortMode::Extended => "extended",
            SortMode::Expr => "expr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupFunc {
    Day,
    Week,
    Month,
    Year,
    Attr,
    AttrPair,
}

impl GroupFunc {
    const ALL: [GroupFunc; 6] = [
        GroupFunc::Day,
        GroupFunc::Week,
        GroupFunc::Month,
        GroupFunc::Year,
        GroupFunc::Attr,
        GroupFunc::AttrPair,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Codes outside day..attrpair are rejected so they never reach the wire.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_label(self) -> &'static str {
        match self {
            GroupFunc::Day => "day",
            GroupFunc::Week => "week",
            GroupFunc::Month => "month",
            GroupFunc::Year => "year",
            GroupFunc::Attr => "attr",
            GroupFunc::AttrPair => "attr_pair",
        }
    }
}

macro_rules! label_from_str {
    ($ty:ident, $what:literal) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if let Ok(code) = s.trim().parse::<u32>() {
                    return Self::try_from(code);
                }
                let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_label() == wanted)
                    .ok_or_else(|| Error::invalid(format!("unknown {} '{}'", $what, s)))
            }
        }

        impl TryFrom<u32> for $ty {
            type Error = Error;

            fn try_from(code: u32) -> Result<Self, Self::Error> {
                Self::from_code(code)
                    .ok_or_else(|| Error::invalid(format!("unknown {} code {}", $what, code)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_label())
            }
        }
    };
}

label_from_str!(MatchMode, "match mode");
label_from_str!(RankingMode, "ranking mode");
label_from_str!(SortMode, "sort mode");
label_from_str!(GroupFunc, "group-by function");

const ATTR_MULTI: u32 = 0x4000_0000;

/// Attribute type tag from the reply schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Integer,
    Timestamp,
    Ordinal,
    Bool,
    Float,
    BigInt,
    String,
    /// MVA of 32-bit values.
    Multi,
    /// MVA of 64-bit values.
    Multi64,
    /// Unrecognized tag; values decode as a 32-bit MVA when the multi bit
    /// is set and are rejected otherwise.
    Other(u32),
}

impl AttrType {
    pub fn code(self) -> u32 {
        match self {
            AttrType::Integer => 1,
            AttrType::Timestamp => 2,
            AttrType::Ordinal => 3,
            AttrType::Bool => 4,
            AttrType::Float => 5,
            AttrType::BigInt => 6,
            AttrType::String => 7,
            AttrType::Multi => ATTR_MULTI | 1,
            AttrType::Multi64 => ATTR_MULTI | 2,
            AttrType::Other(code) => code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            1 => AttrType::Integer,
            2 => AttrType::Timestamp,
            3 => AttrType::Ordinal,
            4 => AttrType::Bool,
            5 => AttrType::Float,
            6 => AttrType::BigInt,
            7 => AttrType::String,
            c if c == ATTR_MULTI | 1 => AttrType::Multi,
            c if c == ATTR_MULTI | 2 => AttrType::Multi64,
            other => AttrType::Other(other),
        }
    }

    pub fn is_multi(self) -> bool {
        self.code() & ATTR_MULTI != 0
    }
}

impl FromStr for AttrType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "uint" => AttrType::Integer,
            "timestamp" => AttrType::Timestamp,
            "ordinal" => AttrType::Ordinal,
            "bool" => AttrType::Bool,
            "float" => AttrType::Float,
            "bigint" => AttrType::BigInt,
            "string" => AttrType::String,
            "mva" | "multi" => AttrType::Multi,
            "mva64" => AttrType::Multi64,
            other => return Err(Error::invalid(format!("unknown attribute type '{other}'"))),
        })
    }
}

impl Serialize for AttrType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

impl Serialize for ReplyStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

/// One decoded attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Integer(i64),
    Float(f32),
    String(String),
    IntegerArray(Vec<i64>),
}

impl AttrValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[i64]> {
        match self {
            AttrValue::IntegerArray(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: u64,
    pub weight: u32,
    pub attrs: Vec<(String, AttrValue)>,
}

impl Match {
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Serialize for Match {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Match", 3)?;
        st.serialize_field("id", &self.id)?;
        st.serialize_field("weight", &self.weight)?;
        st.serialize_field("attrs", &Pairs(&self.attrs))?;
        st.end()
    }
}

/// Matches of one result, keyed by document id or kept as a plain sequence.
///
/// Keyed mode is the legacy default. Two matches with the same id collapse
/// into one entry: the later match replaces the earlier one's contents while
/// keeping its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matches {
    keyed: bool,
    entries: Vec<Match>,
    positions: HashMap<u64, usize>,
}

impl Matches {
    pub fn keyed() -> Self {
        Self {
            keyed: true,
            ..Default::default()
        }
    }

    pub fn list() -> Self {
        Self::default()
    }

    pub fn for_mode(array_result: bool) -> Self {
        if array_result {
            Self::list()
        } else {
            Self::keyed()
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.keyed
    }

    pub fn push(&mut self, m: Match) {
        if !self.keyed {
            self.entries.push(m);
            return;
        }
        match self.positions.get(&m.id) {
            Some(&pos) => self.entries[pos] = m,
            None => {
                self.positions.insert(m.id, self.entries.len());
                self.entries.push(m);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.entries.iter()
    }

    /// First match with this id; keyed mode looks it up by index.
    pub fn get(&self, id: u64) -> Option<&Match> {
        if self.keyed {
            self.positions.get(&id).map(|&pos| &self.entries[pos])
        } else {
            self.entries.iter().find(|m| m.id == id)
        }
    }

    pub fn as_slice(&self) -> &[Match] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a Matches {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for Matches {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.keyed {
            let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
            for m in &self.entries {
                seq.serialize_element(m)?;
            }
            return seq.end();
        }

        #[derive(Serialize)]
        struct Keyed<'a> {
            weight: u32,
            attrs: Pairs<'a, AttrValue>,
        }

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for m in &self.entries {
            map.serialize_entry(
                &m.id.to_string(),
                &Keyed {
                    weight: m.weight,
                    attrs: Pairs(&m.attrs),
                },
            )?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordStats {
    #[serde(skip)]
    pub word: String,
    pub docs: u32,
    pub hits: u32,
}

/// Outcome of one query in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub error: String,
    pub warning: String,
    pub status: ReplyStatus,
    pub fields: Vec<String>,
    #[serde(serialize_with = "serialize_pairs")]
    pub attrs: Vec<(String, AttrType)>,
    pub matches: Matches,
    pub total: u32,
    pub total_found: u32,
    /// Seconds spent by the daemon.
    pub time: f64,
    #[serde(serialize_with = "serialize_words")]
    pub words: Vec<WordStats>,
}

impl ResultRecord {
    pub fn empty(array_result: bool) -> Self {
        Self {
            error: String::new(),
            warning: String::new(),
            status: ReplyStatus::Ok,
            fields: Vec::new(),
            attrs: Vec::new(),
            matches: Matches::for_mode(array_result),
            total: 0,
            total_found: 0,
            time: 0.0,
            words: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, ReplyStatus::Error | ReplyStatus::Retry)
    }

    pub fn attr_type(&self, name: &str) -> Option<AttrType> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, t)| *t)
    }

    pub fn word(&self, term: &str) -> Option<&WordStats> {
        self.words.iter().find(|w| w.word == term)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordInfo {
    pub tokenized: String,
    pub normalized: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<u32>,
}

/// Serializes ordered `(name, value)` pairs as a JSON object.
struct Pairs<'a, V>(&'a [(String, V)]);

impl<V: Serialize> Serialize for Pairs<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_pairs<S: Serializer, V: Serialize>(
    pairs: &Vec<(String, V)>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    Pairs(pairs.as_slice()).serialize(serializer)
}

#[allow(clippy::ptr_arg)]
fn serialize_words<S: Serializer>(words: &Vec<WordStats>, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(words.len()))?;
    for w in words {
        map.serialize_entry(&w.word, w)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn m(id: u64, weight: u32) -> Match {
        Match {
            id,
            weight,
            attrs: vec![("group_id".to_string(), AttrValue::Integer(weight as i64))],
        }
    }

    #[test]
    fn keyed_matches_collapse_duplicate_ids() {
        let mut matches = Matches::keyed();
        matches.push(m(7, 1));
        matches.push(m(3, 2));
        matches.push(m(7, 5));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches.as_slice()[0].id, 7);
        assert_eq!(matches.get(7).unwrap().weight, 5);
        assert_eq!(matches.get(3).unwrap().weight, 2);
        assert!(matches.get(4).is_none());
    }

    #[test]
    fn listed_matches_keep_duplicates() {
        let mut matches = Matches::list();
        matches.push(m(7, 1));
        matches.push(m(7, 5));
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.id == 7));
        assert_eq!(matches.get(7).unwrap().weight, 1);
    }

    #[test]
    fn keyed_matches_serialize_as_object() {
        let mut matches = Matches::keyed();
        matches.push(m(7, 1));
        let value = serde_json::to_value(&matches).unwrap();
        assert_eq!(
            value,
            json!({"7": {"weight": 1, "attrs": {"group_id": 1}}})
        );

        let mut listed = Matches::list();
        listed.push(m(7, 1));
        let value = serde_json::to_value(&listed).unwrap();
        assert_eq!(
            value,
            json!([{"id": 7, "weight": 1, "attrs": {"group_id": 1}}])
        );
    }

    #[test]
    fn record_serializes_schema_surface() {
        let mut record = ResultRecord::empty(true);
        record.fields = vec!["title".into()];
        record.attrs = vec![
            ("group_id".into(), AttrType::Integer),
            ("tags".into(), AttrType::Multi),
        ];
        record.words = vec![WordStats {
            word: "test".into(),
            docs: 3,
            hits: 5,
        }];
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], json!(0));
        assert_eq!(value["attrs"], json!({"group_id": 1, "tags": 0x4000_0001u32}));
        assert_eq!(value["words"], json!({"test": {"docs": 3, "hits": 5}}));
        assert_eq!(value["matches"], json!([]));
    }

    #[test]
    fn enums_parse_labels_and_codes() {
        assert_eq!("extended2".parse::<MatchMode>().unwrap(), MatchMode::Extended2);
        assert_eq!("attr-desc".parse::<SortMode>().unwrap(), SortMode::AttrDesc);
        assert_eq!(RankingMode::from_code(8), Some(RankingMode::Expr));
        assert_eq!(GroupFunc::from_code(5), Some(GroupFunc::AttrPair));
        assert_eq!(GroupFunc::from_code(6), None);
        assert!("sideways".parse::<GroupFunc>().is_err());
        assert!(GroupFunc::try_from(6).is_err());
        assert_eq!(MatchMode::try_from(1).unwrap(), MatchMode::Any);
    }

    #[test]
    fn attr_type_codes() {
        assert_eq!(AttrType::from_code(0x4000_0001), AttrType::Multi);
        assert!(AttrType::Multi64.is_multi());
        assert!(!AttrType::Float.is_multi());
        assert_eq!(AttrType::from_code(99), AttrType::Other(99));
    }
}
