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

mod cli;
mod config;
mod output;

use anyhow::Context as _;
use anyhow::Result;
use clap::CommandFactory;
use clap::Parser;
use sphinx_client::ExcerptOptions;
use sphinx_client::SphinxClient;
use tracing::Level;
use tracing::debug;

use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::ExcerptsArgs;
use crate::cli::KeywordsArgs;
use crate::cli::SearchArgs;
use crate::cli::ServerArgs;
use crate::cli::UpdateArgs;
use crate::config::Config;
use crate::output::JsonResponse;
use crate::output::print_json;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &config.log_level);
    match cli.command {
        Commands::Search(args) => {
            let json = args.json;
            handle_result(cmd_search(&config, args), json)
        }
        Commands::Excerpts(args) => {
            let json = args.json;
            handle_result(cmd_excerpts(&config, args), json)
        }
        Commands::Keywords(args) => {
            let json = args.json;
            handle_result(cmd_keywords(&config, args), json)
        }
        Commands::Update(args) => {
            let json = args.json;
            handle_result(cmd_update(&config, args), json)
        }
        Commands::Status { server, json } => handle_result(cmd_status(&config, &server, json), json),
        Commands::Escape { text } => {
            println!("{}", sphinx_client::escape_string(&text));
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sphinx", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn init_logging(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured.parse().unwrap_or(Level::WARN),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    // a second init in the same process keeps the first subscriber
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn handle_result(result: Result<()>, json: bool) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            if json {
                let resp = JsonResponse::from_error(&err);
                print_json(&resp)?;
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

fn connect(config: &Config, server: &ServerArgs) -> Result<SphinxClient> {
    let client = config.client(server)?;
    debug!(endpoint = %client.endpoint(), "client configured");
    Ok(client)
}

fn cmd_search(config: &Config, args: SearchArgs) -> Result<()> {
    let mut client = connect(config, &args.server)?;
    client.set_array_result(args.array || config.array_result);
    client.set_limits(args.offset, args.limit, args.max_matches, args.cutoff)?;
    if let Some(mode) = args.match_mode {
        client.set_match_mode(mode)?;
    }
    if let Some(ranker) = args.ranker {
        client.set_ranking_mode(ranker, args.rank_expr.as_deref())?;
    }
    if let Some(sort) = args.sort {
        client.set_sort_mode(sort, args.sort_by.as_deref())?;
    }
    for spec in &args.filter {
        let (attr, exclude, values) = split_filter(spec)?;
        let values = values
            .split(',')
            .map(|v| v.trim().parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("filter values in '{spec}'"))?;
        client.set_filter(attr, &values, exclude)?;
    }
    for spec in &args.range {
        let (attr, exclude, range) = split_filter(spec)?;
        let (min, max) = split_range(range)?;
        let min: i64 = min.parse().with_context(|| format!("range minimum in '{spec}'"))?;
        let max: i64 = max.parse().with_context(|| format!("range maximum in '{spec}'"))?;
        client.set_filter_range(attr, min, max, exclude)?;
    }
    for spec in &args.float_range {
        let (attr, exclude, range) = split_filter(spec)?;
        let (min, max) = split_range(range)?;
        let min: f32 = min.parse().with_context(|| format!("range minimum in '{spec}'"))?;
        let max: f32 = max.parse().with_context(|| format!("range maximum in '{spec}'"))?;
        client.set_filter_float_range(attr, min, max, exclude)?;
    }
    if !args.field_weight.is_empty() {
        let weights = args
            .field_weight
            .iter()
            .map(|spec| {
                let (name, weight) = spec
                    .split_once('=')
                    .with_context(|| format!("field weight '{spec}' must be field=weight"))?;
                let weight: u32 = weight
                    .parse()
                    .with_context(|| format!("weight in '{spec}'"))?;
                Ok((name.to_string(), weight))
            })
            .collect::<Result<Vec<_>>>()?;
        client.set_field_weights(weights)?;
    }
    if let Some(attr) = &args.group_by {
        client.set_group_by(attr, args.group_func, args.group_sort.as_deref())?;
    }
    if let Some(select) = &args.select {
        client.set_select(select)?;
    }
    if let Some(ms) = args.max_query_time {
        client.set_max_query_time(ms)?;
    }

    client.add_query(&args.query, Some(args.index.as_str()), args.comment.as_deref())?;
    let records = client.run_queries()?;

    if args.json {
        let resp = JsonResponse::ok()
            .with_results(records)
            .with_warning(client.last_warning());
        print_json(&resp)?;
    } else {
        if !client.last_warning().is_empty() {
            eprintln!("warning: {}", client.last_warning());
        }
        output::print_results(&records);
    }
    Ok(())
}

/// Splits `attr=rest`, where a leading `!` on attr marks an exclude filter.
fn split_filter(spec: &str) -> Result<(&str, bool, &str)> {
    let (attr, rest) = spec
        .split_once('=')
        .with_context(|| format!("filter '{spec}' must be attr=values"))?;
    match attr.strip_prefix('!') {
        Some(attr) => Ok((attr, true, rest)),
        None => Ok((attr, false, rest)),
    }
}

fn split_range(range: &str) -> Result<(&str, &str)> {
    let (min, max) = range
        .split_once("..")
        .with_context(|| format!("range '{range}' must be min..max"))?;
    Ok((min.trim(), max.trim()))
}

fn cmd_excerpts(config: &Config, args: ExcerptsArgs) -> Result<()> {
    let opts = match &args.options {
        Some(text) => {
            let value: serde_json::Value =
                serde_json::from_str(text).context("parse --options JSON")?;
            let map = value
                .as_object()
                .context("--options must be a JSON object")?;
            ExcerptOptions::from_json(map)
        }
        None => ExcerptOptions::default(),
    };
    let mut client = connect(config, &args.server)?;
    let excerpts = client.build_excerpts(&args.docs, &args.index, &args.words, &opts)?;
    if args.json {
        let resp = JsonResponse::ok()
            .with_excerpts(excerpts)
            .with_warning(client.last_warning());
        print_json(&resp)?;
    } else {
        for excerpt in excerpts {
            println!("{excerpt}");
        }
    }
    Ok(())
}

fn cmd_keywords(config: &Config, args: KeywordsArgs) -> Result<()> {
    let mut client = connect(config, &args.server)?;
    let keywords = client.build_keywords(&args.query, &args.index, args.hits)?;
    if args.json {
        let resp = JsonResponse::ok()
            .with_keywords(keywords)
            .with_warning(client.last_warning());
        print_json(&resp)?;
    } else {
        output::print_keywords(&keywords);
    }
    Ok(())
}

fn cmd_update(config: &Config, args: UpdateArgs) -> Result<()> {
    let mut client = connect(config, &args.server)?;
    let updated = if args.mva {
        let rows = args
            .rows
            .iter()
            .map(|row| {
                let (id, lists) = parse_row(row)?;
                let lists = lists
                    .split(';')
                    .map(|list| parse_u32_list(list, row))
                    .collect::<Result<Vec<_>>>()?;
                Ok((id, lists))
            })
            .collect::<Result<Vec<_>>>()?;
        client.update_attributes_mva(&args.index, &args.attrs, &rows)?
    } else {
        let rows = args
            .rows
            .iter()
            .map(|row| {
                let (id, values) = parse_row(row)?;
                Ok((id, parse_u32_list(values, row)?))
            })
            .collect::<Result<Vec<_>>>()?;
        client.update_attributes(&args.index, &args.attrs, &rows)?
    };
    if args.json {
        let resp = JsonResponse::ok()
            .with_updated(updated)
            .with_warning(client.last_warning());
        print_json(&resp)?;
    } else {
        println!("Updated {updated} documents");
    }
    Ok(())
}

fn parse_row(row: &str) -> Result<(u64, &str)> {
    let (id, rest) = row
        .split_once('=')
        .with_context(|| format!("row '{row}' must be id=values"))?;
    let id = id
        .trim()
        .parse()
        .with_context(|| format!("document id in '{row}'"))?;
    Ok((id, rest))
}

fn parse_u32_list(list: &str, row: &str) -> Result<Vec<u32>> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(|v| {
            v.trim()
                .parse::<u32>()
                .with_context(|| format!("value '{v}' in '{row}'"))
        })
        .collect()
}

fn cmd_status(config: &Config, server: &ServerArgs, json: bool) -> Result<()> {
    let mut client = connect(config, server)?;
    let rows = client.status()?;
    if json {
        let resp = JsonResponse::ok()
            .with_status(rows)
            .with_warning(client.last_warning());
        print_json(&resp)?;
    } else {
        for row in rows {
            println!("{}", row.join("\t"));
        }
    }
    Ok(())
}
