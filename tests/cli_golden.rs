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

mod common;

use std::net::TcpListener;
use std::path::Path;

use assert_cmd::Command;
use common::FakeDaemon;
use common::Reply;
use common::ResultWriter;
use common::search_body;
use jsonschema::JSONSchema;
use predicates::prelude::*;
use serde_json::Value;
use sphinx_client::Capabilities;
use sphinx_client::codec::Encoder;
use sphinx_client::query::FilterKind;
use sphinx_client::query::decode_search_request;
use tempfile::TempDir;

fn sphinx_cmd(config_root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sphinx"));
    cmd.env("XDG_CONFIG_HOME", config_root);
    cmd.env("HOME", config_root);
    cmd.env("APPDATA", config_root);
    cmd
}

fn load_schema() -> JSONSchema {
    let schema_text = include_str!("../schemas/response.schema.json");
    let schema_json: Value = serde_json::from_str(schema_text).expect("schema json");
    JSONSchema::options()
        .compile(&schema_json)
        .expect("compile schema")
}

fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("parse json")
}

fn assert_schema(schema: &JSONSchema, value: &Value) {
    if let Err(errors) = schema.validate(value) {
        let msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
        panic!("schema validation failed:\n{}", msgs.join("\n"));
    }
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

#[test]
fn escape_prints_escaped_text() {
    let home = TempDir::new().expect("home");
    sphinx_cmd(home.path())
        .args(["escape", "foo (bar) | baz!"])
        .assert()
        .success()
        .stdout("foo \\(bar\\) \\| baz\\!\n");
}

#[test]
fn completions_are_generated() {
    let home = TempDir::new().expect("home");
    sphinx_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sphinx"));
}

#[test]
fn keywords_json_from_config_file() {
    let mut body = Encoder::new();
    body.put_u32(1)
        .put_str("Hello")
        .put_str("hello")
        .put_u32(3)
        .put_u32(5);
    let daemon = FakeDaemon::start(vec![Reply::ok(body.into_inner())]);

    let home = TempDir::new().expect("home");
    let config = home.path().join("custom.toml");
    std::fs::write(
        &config,
        format!("host = \"127.0.0.1\"\nport = {}\n", daemon.port),
    )
    .expect("write config");

    let json = run_json(sphinx_cmd(home.path()).args([
        "--config",
        config.to_str().expect("utf8 path"),
        "keywords",
        "Hello",
        "--index",
        "test1",
        "--hits",
        "--json",
    ]));
    assert_schema(&load_schema(), &json);
    insta::with_settings!({sort_maps => true}, {
        insta::assert_json_snapshot!(json, @r#"
        {
          "keywords": [
            {
              "docs": 3,
              "hits": 5,
              "normalized": "hello",
              "tokenized": "Hello"
            }
          ],
          "ok": true,
          "schema_version": "1"
        }
        "#);
    });
}

#[test]
fn search_json_matches_schema() {
    let body = search_body(vec![ResultWriter::new().ok(
        &["title", "content"],
        &[("group_id", 1), ("date_added", 2)],
        &[(1, 2, vec![1, 1_300_000_000]), (2, 2, vec![1, 1_300_000_100])],
    )]);
    let daemon = FakeDaemon::start(vec![Reply::ok(body)]);
    let home = TempDir::new().expect("home");
    let port = daemon.port.to_string();

    let json = run_json(sphinx_cmd(home.path()).args([
        "search",
        "test",
        "--host",
        "127.0.0.1",
        "--port",
        &port,
        "--index",
        "test1",
        "--filter",
        "group_id=1",
        "--range",
        "!date_added=0..10",
        "--array",
        "--json",
    ]));
    assert_schema(&load_schema(), &json);
    assert_eq!(json["ok"], true);
    let result = &json["results"][0];
    assert_eq!(result["status"], 0);
    assert_eq!(result["attrs"]["date_added"], 2);
    assert_eq!(result["matches"][1]["id"], 2);
    assert_eq!(result["matches"][0]["attrs"]["group_id"], 1);
    assert_eq!(result["words"]["test"]["docs"], 2);

    let queries =
        decode_search_request(&daemon.requests()[0].body, &Capabilities::all()).expect("decode");
    assert_eq!(queries[0].indexes, "test1");
    assert_eq!(queries[0].filters.len(), 2);
    assert_eq!(queries[0].filters[0].kind, FilterKind::Values(vec![1]));
    assert!(queries[0].filters[1].exclude);
}

#[test]
fn search_table_formats_timestamps() {
    let body = search_body(vec![ResultWriter::new().ok(
        &["title"],
        &[("date_added", 2)],
        &[(3, 1, vec![1_300_000_000])],
    )]);
    let daemon = FakeDaemon::start(vec![Reply::ok(body)]);
    let home = TempDir::new().expect("home");
    sphinx_cmd(home.path())
        .args(["search", "test", "--host", "127.0.0.1", "--port"])
        .arg(daemon.port.to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains("Query retrieved 1 of 1 matches"))
        .stdout(predicate::str::contains(
            "1. doc_id=3, weight=1, date_added=2011-03-13 07:06:40",
        ));
}

#[test]
fn connect_failure_json_envelope() {
    let home = TempDir::new().expect("home");
    let port = closed_port().to_string();
    let json = run_json(sphinx_cmd(home.path()).args([
        "status",
        "--host",
        "127.0.0.1",
        "--port",
        &port,
        "--json",
    ]));
    assert_schema(&load_schema(), &json);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "connect");
    assert!(json["error"]["hint"].is_string());
}

#[test]
fn connect_failure_without_json_exits_nonzero() {
    let home = TempDir::new().expect("home");
    sphinx_cmd(home.path())
        .args(["status", "--host", "127.0.0.1", "--port"])
        .arg(closed_port().to_string())
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: connection to 127.0.0.1:"));
}

#[test]
fn update_mismatch_is_usage_error() {
    let home = TempDir::new().expect("home");
    let port = closed_port().to_string();
    let json = run_json(sphinx_cmd(home.path()).args([
        "update",
        "--host",
        "127.0.0.1",
        "--port",
        &port,
        "--index",
        "test1",
        "--attrs",
        "group_id,price",
        "1=5",
        "--json",
    ]));
    assert_schema(&load_schema(), &json);
    insta::with_settings!({sort_maps => true}, {
        insta::assert_json_snapshot!(json, @r#"
        {
          "error": {
            "code": "invalid_argument",
            "details": null,
            "hint": null,
            "message": "invalid argument: document 1: number of values (1) is not equal to the number of attributes (2)"
          },
          "ok": false,
          "schema_version": "1"
        }
        "#);
    });
}

#[test]
fn excerpts_use_json_options() {
    let mut body = Encoder::new();
    body.put_str("my <b>test</b> text");
    let daemon = FakeDaemon::start(vec![Reply::ok(body.into_inner())]);
    let home = TempDir::new().expect("home");
    let port = daemon.port.to_string();
    let json = run_json(sphinx_cmd(home.path()).args([
        "excerpts",
        "my test text",
        "--host",
        "127.0.0.1",
        "--port",
        &port,
        "--index",
        "test1",
        "--words",
        "test",
        "--options",
        r#"{"before_match": "<b>", "limit": "60", "ratio": 1.5, "exact_phrase": true}"#,
        "--json",
    ]));
    assert_schema(&load_schema(), &json);
    assert_eq!(json["excerpts"][0], "my <b>test</b> text");

    let req = &daemon.requests()[0];
    let mut dec = sphinx_client::codec::Decoder::new(&req.body);
    assert_eq!(dec.get_u32().expect("mode"), 0);
    assert_eq!(dec.get_u32().expect("flags"), 1 | 2);
}
