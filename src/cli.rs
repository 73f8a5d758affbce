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

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use sphinx_client::GroupFunc;
use sphinx_client::MatchMode;
use sphinx_client::RankingMode;
use sphinx_client::SortMode;

#[derive(Parser, Debug)]
#[command(name = "sphinx", version, about = "Command-line client for the searchd daemon")]
pub struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a search query
    Search(SearchArgs),

    /// Build highlighted snippets for documents
    Excerpts(ExcerptsArgs),

    /// Tokenize a query against an index
    Keywords(KeywordsArgs),

    /// Update attribute values in place
    Update(UpdateArgs),

    /// Show daemon status counters
    Status {
        #[command(flatten)]
        server: ServerArgs,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Escape query syntax characters
    Escape {
        /// Text to escape
        text: String,
    },

    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct ServerArgs {
    /// Daemon host, or a socket path starting with `/`
    #[arg(long)]
    pub host: Option<String>,

    /// Daemon port
    #[arg(long)]
    pub port: Option<u16>,

    /// Local socket path
    #[arg(long, conflicts_with = "host")]
    pub socket: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text
    pub query: String,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Index list
    #[arg(long, default_value = "*")]
    pub index: String,

    /// Comment logged by the daemon
    #[arg(long)]
    pub comment: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    #[arg(long)]
    pub max_matches: Option<u32>,

    #[arg(long)]
    pub cutoff: Option<u32>,

    /// all, any, phrase, boolean, extended, fullscan, extended2
    #[arg(long)]
    pub match_mode: Option<MatchMode>,

    /// Ranker name or code
    #[arg(long)]
    pub ranker: Option<RankingMode>,

    /// Ranking expression for `--ranker expr`
    #[arg(long)]
    pub rank_expr: Option<String>,

    #[arg(long)]
    pub sort: Option<SortMode>,

    /// Sort clause
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Value filter, `attr=v1,v2`; prefix attr with `!` to exclude
    #[arg(long)]
    pub filter: Vec<String>,

    /// Range filter, `attr=min..max`; prefix attr with `!` to exclude
    #[arg(long)]
    pub range: Vec<String>,

    /// Float range filter, `attr=min..max`
    #[arg(long)]
    pub float_range: Vec<String>,

    /// Field weight, `field=weight`
    #[arg(long)]
    pub field_weight: Vec<String>,

    #[arg(long)]
    pub group_by: Option<String>,

    #[arg(long, default_value = "attr")]
    pub group_func: GroupFunc,

    #[arg(long)]
    pub group_sort: Option<String>,

    #[arg(long)]
    pub select: Option<String>,

    /// Max query time in milliseconds
    #[arg(long)]
    pub max_query_time: Option<u32>,

    /// Return matches as a list instead of keyed by id
    #[arg(long)]
    pub array: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExcerptsArgs {
    /// Document bodies
    #[arg(required = true)]
    pub docs: Vec<String>,

    #[command(flatten)]
    pub server: ServerArgs,

    #[arg(long)]
    pub index: String,

    /// Words to highlight
    #[arg(long)]
    pub words: String,

    /// Options as a JSON object, e.g. `{"limit": 60}`
    #[arg(long)]
    pub options: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct KeywordsArgs {
    /// Query text
    pub query: String,

    #[command(flatten)]
    pub server: ServerArgs,

    #[arg(long)]
    pub index: String,

    /// Include per-keyword document and hit counts
    #[arg(long)]
    pub hits: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Rows as `id=v1,v2`, one value per attribute; with --mva,
    /// `id=a1,a2;b1` with one list per attribute
    #[arg(required = true)]
    pub rows: Vec<String>,

    #[command(flatten)]
    pub server: ServerArgs,

    #[arg(long)]
    pub index: String,

    /// Attribute names
    #[arg(long, value_delimiter = ',', required = true)]
    pub attrs: Vec<String>,

    /// Update multi-valued attributes
    #[arg(long)]
    pub mva: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}
