//! Merge command - the full pipeline from two directories to output files.

use anyhow::{Context, Result};
use std::fs;

use crate::config::MergeConfig;
use crate::database::AccountDatabase;
use crate::merge;
use crate::policy::RangePolicy;
use crate::writer;

/// Execute the merge command.
///
/// Loads both databases, runs the merge, and writes the result. Nothing is
/// written when the merge fails, so a collision leaves the output directory
/// untouched.
pub fn cmd_merge(config: &MergeConfig) -> Result<()> {
    let policy = RangePolicy::resolve(config.defs.as_deref(), Some(config.dest_dir.as_path()))?;

    if !config.quiet {
        config.print();
        println!();
    }

    let source = AccountDatabase::load(&config.source_dir, config.read_shadow)
        .with_context(|| {
            format!("Failed to load source database from {}", config.source_dir.display())
        })?;
    let dest = AccountDatabase::load(&config.dest_dir, config.read_shadow)
        .with_context(|| {
            format!("Failed to load destination database from {}", config.dest_dir.display())
        })?;

    if !config.quiet {
        println!(
            "Merging {} source users into {} destination users",
            source.users.len(),
            dest.users.len()
        );
    }

    let (merged, report) = merge::run(config, source, dest, &policy)?;
    writer::save(&merged, &config.output_dir)?;

    if let Some(path) = &config.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if !config.quiet {
        report.print();
        println!("Merged database written to {}", config.output_dir.display());
    }
    Ok(())
}
