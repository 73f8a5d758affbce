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

use anyhow::Result;
use serde::Serialize;
use sphinx_client::AttrType;
use sphinx_client::AttrValue;
use sphinx_client::Error;
use sphinx_client::KeywordInfo;
use sphinx_client::ResultRecord;
use time::OffsetDateTime;
use time::macros::format_description;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorOut {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct JsonResponse {
    pub ok: bool,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ResultRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<KeywordInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<StatusRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOut>,
}

impl JsonResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            schema_version: "1".to_string(),
            ..Default::default()
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            ok: false,
            schema_version: "1".to_string(),
            error: Some(ErrorOut {
                code: code.to_string(),
                message: message.to_string(),
                details: None,
                hint: None,
            }),
            ..Default::default()
        }
    }

    /// Error envelope for a failed command; client errors get a specific
    /// code and, where useful, a hint.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let Some(client_err) = err.downcast_ref::<Error>() else {
            return Self::error("error", &format!("{err:#}"));
        };
        let (code, hint) = match client_err {
            Error::InvalidArgument(_) => ("invalid_argument", None),
            Error::Unsupported(_) => (
                "unsupported",
                Some("enable the feature under [capabilities] in sphinx.toml"),
            ),
            Error::Connect { .. } => ("connect", Some("check that searchd is running")),
            Error::Io { .. } => ("io", None),
            Error::Protocol(_) => ("protocol", None),
            Error::Daemon(_) => ("daemon", None),
        };
        let mut resp = Self::error(code, &client_err.to_string());
        if let Some(out) = &mut resp.error {
            out.hint = hint.map(str::to_string);
            let chain: Vec<String> = err.chain().skip(1).map(|e| e.to_string()).collect();
            if !chain.is_empty() {
                out.details = Some(chain.join(": "));
            }
        }
        resp
    }

    pub fn with_results(mut self, results: Vec<ResultRecord>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_excerpts(mut self, excerpts: Vec<String>) -> Self {
        self.excerpts = Some(excerpts);
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<KeywordInfo>) -> Self {
        self.keywords = Some(keywords);
        self
    }

    pub fn with_status(mut self, rows: Vec<Vec<String>>) -> Self {
        self.status = Some(
            rows.into_iter()
                .map(|mut row| {
                    let value = if row.len() > 1 { row.swap_remove(1) } else { String::new() };
                    StatusRow {
                        name: row.into_iter().next().unwrap_or_default(),
                        value,
                    }
                })
                .collect(),
        );
        self
    }

    pub fn with_updated(mut self, updated: u32) -> Self {
        self.updated = Some(updated);
        self
    }

    pub fn with_warning(mut self, warning: &str) -> Self {
        if !warning.is_empty() {
            self.warnings.push(warning.to_string());
        }
        self
    }
}

pub fn print_json(resp: &JsonResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(resp)?;
    println!("{text}");
    Ok(())
}

/// Formats a unix timestamp as `YYYY-MM-DD HH:MM:SS` UTC.
pub fn format_timestamp(secs: i64) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()
        .and_then(|t| t.format(format).ok())
        .unwrap_or_else(|| secs.to_string())
}

fn format_value(attr_type: Option<AttrType>, value: &AttrValue) -> String {
    match value {
        AttrValue::Integer(v) if attr_type == Some(AttrType::Timestamp) => format_timestamp(*v),
        AttrValue::Integer(v) => v.to_string(),
        AttrValue::Float(v) => format!("{v:.3}"),
        AttrValue::String(s) => s.clone(),
        AttrValue::IntegerArray(values) => format!(
            "({})",
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        ),
    }
}

pub fn print_results(records: &[ResultRecord]) {
    for (i, record) in records.iter().enumerate() {
        if records.len() > 1 {
            println!("== query {i} ==");
        }
        if record.is_error() {
            println!("error: {}", record.error);
            continue;
        }
        if !record.warning.is_empty() {
            eprintln!("warning: {}", record.warning);
        }
        println!(
            "Query retrieved {} of {} matches in {:.3} sec.",
            record.total, record.total_found, record.time
        );
        if !record.words.is_empty() {
            println!("Query stats:");
            for w in &record.words {
                println!("\t'{}' found {} times in {} documents", w.word, w.hits, w.docs);
            }
        }
        if record.matches.is_empty() {
            continue;
        }
        println!("Matches:");
        for (n, m) in record.matches.iter().enumerate() {
            let attrs: Vec<String> = m
                .attrs
                .iter()
                .map(|(name, value)| format!("{name}={}", format_value(record.attr_type(name), value)))
                .collect();
            println!("{}. doc_id={}, weight={}, {}", n + 1, m.id, m.weight, attrs.join(", "));
        }
    }
}

pub fn print_keywords(keywords: &[KeywordInfo]) {
    for k in keywords {
        match (k.docs, k.hits) {
            (Some(docs), Some(hits)) => {
                println!("{}\t{}\t{}\t{}", k.tokenized, k.normalized, docs, hits)
            }
            _ => println!("{}\t{}", k.tokenized, k.normalized),
        }
    }
}
