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

//! In-place attribute updates.
//!
//! Requests are fully validated before anything is sent, so a malformed
//! value table never results in a partial update.

use crate::capability::Capabilities;
use crate::codec::Decoder;
use crate::codec::Encoder;
use crate::error::Error;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateValues {
    /// One value per attribute per document.
    Plain(Vec<(u64, Vec<u32>)>),
    /// One value list for a single MVA attribute of a single document.
    Multi { id: u64, values: Vec<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub index: String,
    pub attrs: Vec<String>,
    pub values: UpdateValues,
}

impl UpdateRequest {
    /// Builds a single request updating plain integer attributes.
    pub fn plain(index: &str, attrs: &[String], values: &[(u64, Vec<u32>)]) -> Result<Self> {
        check_target(index, attrs)?;
        check_rows(attrs.len(), values.iter().map(|(id, row)| (*id, row.len())))?;
        Ok(Self {
            index: index.to_string(),
            attrs: attrs.to_vec(),
            values: UpdateValues::Plain(values.to_vec()),
        })
    }

    /// Splits an MVA update into one request per (document, attribute).
    pub fn multi(
        index: &str,
        attrs: &[String],
        values: &[(u64, Vec<Vec<u32>>)],
        caps: &Capabilities,
    ) -> Result<Vec<Self>> {
        Capabilities::require(caps.mva_updates, "MVA update")?;
        check_target(index, attrs)?;
        check_rows(attrs.len(), values.iter().map(|(id, row)| (*id, row.len())))?;
        let mut out = Vec::with_capacity(values.len() * attrs.len());
        for (id, row) in values {
            for (attr, list) in attrs.iter().zip(row) {
                out.push(Self {
                    index: index.to_string(),
                    attrs: vec![attr.clone()],
                    values: UpdateValues::Multi {
                        id: *id,
                        values: list.clone(),
                    },
                });
            }
        }
        Ok(out)
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.values, UpdateValues::Multi { .. })
    }

    pub fn encode(&self, caps: &Capabilities) -> Result<Vec<u8>> {
        let multi = self.is_multi();
        if multi {
            Capabilities::require(caps.mva_updates, "MVA update")?;
        }
        let mut enc = Encoder::new();
        enc.put_str(&self.index).put_len(self.attrs.len());
        for attr in &self.attrs {
            enc.put_str(attr);
            if caps.mva_updates {
                enc.put_bool(multi);
            }
        }
        match &self.values {
            UpdateValues::Plain(rows) => {
                enc.put_len(rows.len());
                for (id, row) in rows {
                    enc.put_u64(*id);
                    for v in row {
                        enc.put_u32(*v);
                    }
                }
            }
            UpdateValues::Multi { id, values } => {
                enc.put_u32(1).put_u64(*id).put_len(values.len());
                for v in values {
                    enc.put_u32(*v);
                }
            }
        }
        Ok(enc.into_inner())
    }
}

fn check_target(index: &str, attrs: &[String]) -> Result<()> {
    if index.is_empty() {
        return Err(Error::invalid("index must not be empty"));
    }
    if attrs.is_empty() {
        return Err(Error::invalid("empty attributes array passed"));
    }
    if attrs.iter().any(|a| a.is_empty()) {
        return Err(Error::invalid("attribute names must not be empty"));
    }
    Ok(())
}

fn check_rows(nattrs: usize, rows: impl ExactSizeIterator<Item = (u64, usize)>) -> Result<()> {
    if rows.len() == 0 {
        return Err(Error::invalid("empty values array passed"));
    }
    for (id, len) in rows {
        if len != nattrs {
            return Err(Error::invalid(format!(
                "document {id}: number of values ({len}) is not equal to the number of attributes ({nattrs})"
            )));
        }
    }
    Ok(())
}

/// Number of documents the daemon updated.
pub fn decode_update_reply(body: &[u8]) -> Result<u32> {
    Decoder::new(body).get_u32()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_request_layout() {
        let req =
            UpdateRequest::plain("test1", &names(&["group_id"]), &[(4, vec![456]), (3, vec![1])])
                .unwrap();
        let body = req.encode(&Capabilities::all()).unwrap();
        let mut dec = Decoder::new(&body);
        assert_eq!(dec.get_str().unwrap(), "test1");
        assert_eq!(dec.get_u32().unwrap(), 1);
        assert_eq!(dec.get_str().unwrap(), "group_id");
        assert!(!dec.get_bool().unwrap());
        assert_eq!(dec.get_u32().unwrap(), 2);
        assert_eq!(dec.get_u64().unwrap(), 4);
        assert_eq!(dec.get_u32().unwrap(), 456);
        assert_eq!(dec.get_u64().unwrap(), 3);
        assert_eq!(dec.get_u32().unwrap(), 1);
        assert!(dec.is_empty());
    }

    #[test]
    fn legacy_request_has_no_mva_flag() {
        let req = UpdateRequest::plain("i", &names(&["a"]), &[(1, vec![2])]).unwrap();
        let full = req.encode(&Capabilities::all()).unwrap();
        let legacy = req.encode(&Capabilities::legacy()).unwrap();
        assert_eq!(full.len(), legacy.len() + 4);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let err = UpdateRequest::plain("i", &names(&["a", "b"]), &[(1, vec![2])]).unwrap_err();
        assert!(err.is_usage());
        assert!(err.to_string().contains("not equal to the number of attributes"));
        assert!(UpdateRequest::plain("i", &[], &[(1, vec![])]).is_err());
        assert!(UpdateRequest::plain("i", &names(&["a"]), &[]).is_err());
        assert!(UpdateRequest::plain("", &names(&["a"]), &[(1, vec![1])]).is_err());
    }

    #[test]
    fn multi_splits_per_document_and_attribute() {
        let reqs = UpdateRequest::multi(
            "i",
            &names(&["tags", "cats"]),
            &[(1, vec![vec![1, 2], vec![]]), (2, vec![vec![3], vec![4, 5, 6]])],
            &Capabilities::all(),
        )
        .unwrap();
        assert_eq!(reqs.len(), 4);
        assert_eq!(reqs[3].attrs, names(&["cats"]));
        assert_eq!(
            reqs[3].values,
            UpdateValues::Multi {
                id: 2,
                values: vec![4, 5, 6]
            }
        );

        let body = reqs[0].encode(&Capabilities::all()).unwrap();
        let mut dec = Decoder::new(&body);
        dec.get_str().unwrap();
        assert_eq!(dec.get_u32().unwrap(), 1);
        assert_eq!(dec.get_str().unwrap(), "tags");
        assert!(dec.get_bool().unwrap());
        assert_eq!(dec.get_u32().unwrap(), 1);
        assert_eq!(dec.get_u64().unwrap(), 1);
        assert_eq!(dec.get_u32().unwrap(), 2);
    }

    #[test]
    fn multi_needs_capability() {
        let err = UpdateRequest::multi(
            "i",
            &names(&["tags"]),
            &[(1, vec![vec![1]])],
            &Capabilities::legacy(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
