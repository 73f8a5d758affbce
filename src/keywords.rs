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

//! Keyword extraction (`build_keywords`).

use crate::codec::Decoder;
use crate::codec::Encoder;
use crate::error::Error;
use crate::error::Result;
use crate::model::KeywordInfo;

pub fn encode_keywords_request(query: &str, index: &str, hits: bool) -> Result<Vec<u8>> {
    if index.is_empty() {
        return Err(Error::invalid("index must not be empty"));
    }
    let mut enc = Encoder::new();
    enc.put_str(query).put_str(index).put_bool(hits);
    Ok(enc.into_inner())
}

pub fn decode_keywords_reply(body: &[u8], hits: bool) -> Result<Vec<KeywordInfo>> {
    let mut dec = Decoder::new(body);
    let n = dec.get_count(8)?;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let tokenized = dec.get_str()?;
        let normalized = dec.get_str()?;
        let (docs, hits) = if hits {
            (Some(dec.get_u32()?), Some(dec.get_u32()?))
        } else {
            (None, None)
        };
        out.push(KeywordInfo {
            tokenized,
            normalized,
            docs,
            hits,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout() {
        let body = encode_keywords_request("hello world", "test1", true).unwrap();
        let mut dec = Decoder::new(&body);
        assert_eq!(dec.get_str().unwrap(), "hello world");
        assert_eq!(dec.get_str().unwrap(), "test1");
        assert!(dec.get_bool().unwrap());
        assert!(dec.is_empty());
        assert!(encode_keywords_request("q", "", false).is_err());
    }

    #[test]
    fn stats_only_when_requested() {
        let mut enc = Encoder::new();
        enc.put_u32(1).put_str("Running").put_str("run").put_u32(4).put_u32(9);
        let with_hits = decode_keywords_reply(enc.as_slice(), true).unwrap();
        assert_eq!(with_hits[0].normalized, "run");
        assert_eq!((with_hits[0].docs, with_hits[0].hits), (Some(4), Some(9)));

        let mut enc = Encoder::new();
        enc.put_u32(1).put_str("Running").put_str("run");
        let bare = decode_keywords_reply(enc.as_slice(), false).unwrap();
        assert_eq!(bare[0].docs, None);
        assert_eq!(
            serde_json::to_value(&bare[0]).unwrap(),
            serde_json::json!({"tokenized": "Running", "normalized": "run"})
        );
    }

    #[test]
    fn zero_keywords_is_empty() {
        let mut enc = Encoder::new();
        enc.put_u32(0);
        assert!(decode_keywords_reply(enc.as_slice(), false).unwrap().is_empty());
    }
}
