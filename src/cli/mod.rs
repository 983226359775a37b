//! Command-line interface module.
//!
//! This module handles argument parsing via clap and conversion into a
//! [`ReductionConfig`](crate::config::ReductionConfig).

mod args;

pub use args::Args;
