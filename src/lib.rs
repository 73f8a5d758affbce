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

//! Client for the searchd binary protocol.
//!
//! [`SphinxClient`] is the entry point: configure the endpoint and search
//! settings, queue queries with [`SphinxClient::add_query`] and send them in
//! one round trip with [`SphinxClient::run_queries`].

pub mod capability;
pub mod client;
pub mod codec;
pub mod decode;
pub mod error;
pub mod escape;
pub mod excerpt;
pub mod keywords;
pub mod model;
pub mod query;
pub mod transport;
pub mod update;

pub use capability::Capabilities;
pub use client::SphinxClient;
pub use error::Error;
pub use error::Result;
pub use escape::escape_string;
pub use excerpt::ExcerptOptions;
pub use model::AttrType;
pub use model::AttrValue;
pub use model::GroupFunc;
pub use model::KeywordInfo;
pub use model::Match;
pub use model::MatchMode;
pub use model::Matches;
pub use model::RankingMode;
pub use model::ResultRecord;
pub use model::SortMode;
pub use query::WeightKey;
pub use transport::ConnState;
pub use transport::Endpoint;
