//! Command-line harness for Tidings.
//!
//! # Key Abstractions
//!
//! - [`TidingsCli`]: resolves configuration, builds the store and embedding
//!   loader, and dispatches commands
//! - [`TidingsConfig`]: file/env/default configuration via `confyg`
//! - [`handlers`]: index, search, portfolio, run, demo and delete commands
//!
//! # Commands
//!
//! ```text
//! tidings index articles.json          # embed and upsert every article
//! tidings search "bond yields" -k 5    # one fused search, JSON on stdout
//! tidings portfolio --queries q.json   # one search per {portfolio_tag, text}
//! tidings run articles.json            # index, search the portfolio, write search_results.json
//! tidings demo                         # index a sample article and search it
//! tidings delete-collection
//! tidings config init | path | get <key> | set <key> <value> | export
//! ```
//!
//! `tidings --backend memory --provider mock demo` runs fully offline.

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod handlers;

pub use app::TidingsCli;
pub use cli::{CliArgs, Command, ConfigAction, ConfigCommand};
pub use config::{QdrantConfig, TidingsConfig};
