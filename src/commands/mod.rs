//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `merge` - Merge a source account database into a destination
//! - `show` - Display information

pub mod merge;
pub mod show;

pub use merge::cmd_merge;
pub use show::{cmd_show, ShowTarget};
