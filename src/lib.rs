//! asgen - AppStream metadata generator core
//!
//! asgen is a batch pipeline that reads archive-based package repositories,
//! extracts application metadata from desktop entries shipped by binary
//! packages, and emits per-package and per-maintainer HTML issue reports
//! along with timestamped run statistics.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer (user-facing commands)
//! - `config`: Configuration file loading and parsing
//! - `engine`: Batch driver and the package payload contract
//! - `fetcher`: Repository file resolution with compression probing
//! - `index`: Package index and long-description loading
//! - `hints`: Hint model and the static tag registry
//! - `parsers`: Metadata parser front-ends (desktop entries)
//! - `report`: Hint aggregation and templated HTML reports
//! - `stats`: Timestamped run statistics and chart-series export
//! - `store`: Persistent store contract and implementations
//! - `tagfile`: RFC-822-style tag-file reader

pub mod cli;
pub mod component;
pub mod config;
pub mod engine;
pub mod fetcher;
pub mod hints;
pub mod index;
pub mod locale;
pub mod package;
pub mod parsers;
pub mod report;
pub mod result;
pub mod stats;
pub mod store;
pub mod tagfile;
pub mod utils;
