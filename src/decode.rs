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

//! Search reply decoding.

use tracing::debug;

use crate::capability::Capabilities;
use crate::codec::Decoder;
use crate::codec::ReplyStatus;
use crate::error::Error;
use crate::error::Result;
use crate::model::AttrType;
use crate::model::AttrValue;
use crate::model::Match;
use crate::model::ResultRecord;
use crate::model::WordStats;

/// Decodes `expected` result records from a search reply body.
///
/// A record with an error or retry status carries only its message; the
/// decoder moves straight on to the next record.
pub fn decode_search_reply(
    body: &[u8],
    expected: usize,
    caps: &Capabilities,
    array_result: bool,
) -> Result<Vec<ResultRecord>> {
    let mut dec = Decoder::new(body);
    let mut out = Vec::with_capacity(expected);
    for index in 0..expected {
        let record = decode_record(&mut dec, caps, array_result)?;
        debug!(
            index,
            status = record.status.code(),
            matches = record.matches.len(),
            total_found = record.total_found,
            "decoded result"
        );
        out.push(record);
    }
    if !dec.is_empty() {
        debug!(trailing = dec.remaining(), "ignoring trailing bytes in search reply");
    }
    Ok(out)
}

fn decode_record(
    dec: &mut Decoder<'_>,
    caps: &Capabilities,
    array_result: bool,
) -> Result<ResultRecord> {
    let mut record = ResultRecord::empty(array_result);
    let code = dec.get_u32()?;
    record.status = ReplyStatus::from_code(code)
        .ok_or_else(|| Error::protocol(format!("unknown result status code {code}")))?;
    match record.status {
        ReplyStatus::Ok => {}
        ReplyStatus::Warning => record.warning = dec.get_str()?,
        ReplyStatus::Error | ReplyStatus::Retry => {
            record.error = dec.get_str()?;
            return Ok(record);
        }
    }

    let nfields = dec.get_count(4)?;
    record.fields.reserve(nfields);
    for _ in 0..nfields {
        record.fields.push(dec.get_str()?);
    }

    let nattrs = dec.get_count(8)?;
    record.attrs.reserve(nattrs);
    for _ in 0..nattrs {
        let name = dec.get_str()?;
        let attr_type = AttrType::from_code(dec.get_u32()?);
        if attr_type == AttrType::String && !caps.string_attrs {
            return Err(Error::protocol(format!("unexpected string attribute '{name}'")));
        }
        record.attrs.push((name, attr_type));
    }

    let count = dec.get_u32()? as usize;
    let id64 = dec.get_bool()?;
    for _ in 0..count {
        let id = if id64 {
            dec.get_u64()?
        } else {
            u64::from(dec.get_u32()?)
        };
        let weight = dec.get_u32()?;
        let mut attrs = Vec::with_capacity(record.attrs.len());
        for (name, attr_type) in &record.attrs {
            attrs.push((name.clone(), decode_value(dec, *attr_type)?));
        }
        record.matches.push(Match { id, weight, attrs });
    }

    record.total = dec.get_u32()?;
    record.total_found = dec.get_u32()?;
    record.time = f64::from(dec.get_u32()?) / 1000.0;

    let nwords = dec.get_count(12)?;
    record.words.reserve(nwords);
    for _ in 0..nwords {
        record.words.push(WordStats {
            word: dec.get_str()?,
            docs: dec.get_u32()?,
            hits: dec.get_u32()?,
        });
    }
    Ok(record)
}

fn decode_value(dec: &mut Decoder<'_>, attr_type: AttrType) -> Result<AttrValue> {
    Ok(match attr_type {
        AttrType::Integer | AttrType::Timestamp | AttrType::Ordinal | AttrType::Bool => {
            AttrValue::Integer(i64::from(dec.get_u32()?))
        }
        AttrType::BigInt => AttrValue::Integer(dec.get_i64()?),
        AttrType::Float => AttrValue::Float(dec.get_f32()?),
        AttrType::String => AttrValue::String(dec.get_str()?),
        AttrType::Multi64 => {
            // count is in 32-bit words
            let words = dec.get_count(4)?;
            if words % 2 != 0 {
                return Err(Error::protocol(format!(
                    "64-bit multi-value attribute has an odd word count {words}"
                )));
            }
            let mut values = Vec::with_capacity(words / 2);
            for _ in 0..words / 2 {
                values.push(dec.get_i64()?);
            }
            AttrValue::IntegerArray(values)
        }
        t if t.is_multi() => {
            let n = dec.get_count(4)?;
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(i64::from(dec.get_u32()?));
            }
            AttrValue::IntegerArray(values)
        }
        t => {
            return Err(Error::protocol(format!(
                "unknown attribute type {}",
                t.code()
            )));
        }
    })
}
