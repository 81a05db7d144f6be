//! Merge UNIX account databases.
//!
//! The library half of accmerge. `commands::cmd_merge` drives the whole
//! pipeline; the pieces are usable on their own: `database` loads a
//! directory of passwd/group/shadow/gshadow files, `select` marks accounts
//! by regex, `merge` runs the phased merge under a `policy` id-range
//! policy, and `writer` puts the result back on disk.

pub mod commands;
pub mod config;
pub mod database;
pub mod merge;
pub mod policy;
pub mod records;
pub mod relay;
pub mod select;
pub mod writer;
