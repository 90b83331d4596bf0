// foliant-core/src/lib.rs
// Pure Rust API - embedded JSON document store

#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::only_used_in_recursion)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::ptr_arg)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::nonminimal_bool)]
#![allow(clippy::field_reassign_with_default)]
#![allow(clippy::redundant_comparisons)]
#![allow(clippy::suspicious_open_options)]
#![allow(clippy::doc_lazy_continuation)]
#![allow(clippy::result_large_err)]
#![allow(clippy::match_result_ok)]
#![allow(clippy::manual_unwrap_or_default)]
#![allow(clippy::manual_unwrap_or)]
#![allow(clippy::single_match)]
#![allow(clippy::unnecessary_cast)]
#![allow(clippy::manual_is_multiple_of)]
#![allow(clippy::approx_constant)]
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

pub mod client;
pub mod collection;
pub mod command;
pub mod cursor;
pub mod database;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod indexing_engine;
pub mod logging;
pub mod plan;
pub mod query;
pub mod session;
pub mod storage;
pub mod value_utils;

// Public exports
pub use client::Client;
pub use collection::Collection;
pub use command::{Command, CommandOutcome};
pub use cursor::Cursor;
pub use database::Database;
pub use document::{Document, ObjectId, Value};
pub use error::{FoliantError, Result};
pub use logging::{get_log_level, set_log_level, LogLevel};
pub use session::Session;
