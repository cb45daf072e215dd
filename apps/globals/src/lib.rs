//! # globals
//!
//! Command-line front end for globals-core: node commands, ZWRITE dump and
//! load, binary snapshots, backend selection from flags or a TOML file.

pub mod cli;
pub mod config;
