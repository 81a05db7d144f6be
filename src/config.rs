//! Run configuration for a merge.
//!
//! The CLI maps its flags onto this one value; the library entry points
//! take it explicitly instead of reading flags or environment themselves.

use std::path::PathBuf;

/// Everything one merge run needs to know.
///
/// Empty regex strings select nothing, except that an entirely empty source
/// selection (both patterns empty) defaults to selecting every regular
/// source user.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Directory holding the source passwd/group/shadow/gshadow.
    pub source_dir: PathBuf,
    /// Directory holding the destination files.
    pub dest_dir: PathBuf,
    /// Directory the merged files are written to.
    pub output_dir: PathBuf,
    /// Full-match regex selecting source users.
    pub source_users: String,
    /// Full-match regex selecting source groups (":name" for system groups).
    pub source_groups: String,
    /// Full-match regex selecting destination users to keep.
    pub dest_users: String,
    /// Full-match regex selecting destination groups to keep.
    pub dest_groups: String,
    /// Relay mode: write the sentinel instead of transferred password hashes.
    pub restricted: bool,
    /// Literal password to embed in the sentinel (relay mode only).
    pub relay_password: Option<String>,
    /// Suppress informational output (warnings still go to stderr).
    pub quiet: bool,
    /// Read shadow/gshadow from both directories (defaults fill in if not).
    pub read_shadow: bool,
    /// Explicit login.defs path overriding the usual resolution order.
    pub defs: Option<PathBuf>,
    /// Write a JSON merge report here after a successful merge.
    pub report: Option<PathBuf>,
}

impl MergeConfig {
    /// Print the run parameters.
    pub fn print(&self) {
        println!("Merge configuration:");
        println!("  Source:      {}", self.source_dir.display());
        println!("  Destination: {}", self.dest_dir.display());
        println!("  Output:      {}", self.output_dir.display());
        let show = |label: &str, pattern: &str| {
            if !pattern.is_empty() {
                println!("  {} {}", label, pattern);
            }
        };
        show("Source users: ", &self.source_users);
        show("Source groups:", &self.source_groups);
        show("Dest users:   ", &self.dest_users);
        show("Dest groups:  ", &self.dest_groups);
        if self.restricted {
            println!("  Relay mode:  on");
        }
        if !self.read_shadow {
            println!("  Shadow:      skipped (defaults applied)");
        }
    }
}
