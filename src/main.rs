//! accmerge - account database merge tool.
//!
//! Merges the passwd/group/shadow/gshadow tables of a source directory
//! into a destination's, selecting accounts by regex, and writes the
//! merged files to an output directory.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use accmerge::commands;
use accmerge::config::MergeConfig;

#[derive(Parser)]
#[command(name = "accmerge")]
#[command(about = "Merge UNIX account databases (passwd/group/shadow/gshadow)")]
#[command(
    after_help = "QUICK START:\n  accmerge merge --source SRC --dest DEST --output OUT\n  accmerge merge --source SRC --dest DEST --output OUT --source-users 'alice|bob'\n  accmerge show db DIR                 Inspect a database directory\n  accmerge show policy                 Show the effective id ranges"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a source database into a destination (writes a new directory)
    Merge {
        /// Directory with the source passwd/group/shadow/gshadow
        #[arg(long)]
        source: PathBuf,
        /// Directory with the destination files
        #[arg(long)]
        dest: PathBuf,
        /// Directory to write the merged files to
        #[arg(long)]
        output: PathBuf,

        /// Regex selecting source users (full match; default: all regular users)
        #[arg(long, default_value = "")]
        source_users: String,
        /// Regex selecting source groups; match system groups as ":name"
        #[arg(long, default_value = "")]
        source_groups: String,
        /// Regex selecting destination users to keep
        #[arg(long, default_value = "")]
        dest_users: String,
        /// Regex selecting destination groups whose members to keep
        #[arg(long, default_value = "")]
        dest_groups: String,

        /// Write the relay sentinel instead of transferred password hashes
        #[arg(long)]
        restricted: bool,
        /// Literal password to embed in the relay sentinel
        #[arg(long, requires = "restricted")]
        relay_password: Option<String>,

        /// Don't read shadow/gshadow (locked defaults are written instead)
        #[arg(long)]
        skip_shadow: bool,
        /// login.defs to take UID_MIN/UID_MAX/GID_MIN/GID_MAX from
        #[arg(long)]
        defs: Option<PathBuf>,
        /// Write a JSON merge report to this path
        #[arg(long)]
        report: Option<PathBuf>,
        /// Suppress informational output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show the effective uid/gid range policy
    Policy {
        /// login.defs to read instead of the usual resolution order
        #[arg(long)]
        defs: Option<PathBuf>,
        /// Destination directory whose login.defs takes precedence
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Show a summary of one database directory
    Db {
        /// Directory with passwd/group/shadow/gshadow
        dir: PathBuf,
        /// Don't read shadow/gshadow
        #[arg(long)]
        skip_shadow: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Merge {
            source,
            dest,
            output,
            source_users,
            source_groups,
            dest_users,
            dest_groups,
            restricted,
            relay_password,
            skip_shadow,
            defs,
            report,
            quiet,
        } => {
            let config = MergeConfig {
                source_dir: source,
                dest_dir: dest,
                output_dir: output,
                source_users,
                source_groups,
                dest_users,
                dest_groups,
                restricted,
                relay_password,
                quiet,
                read_shadow: !skip_shadow,
                defs,
                report,
            };
            commands::cmd_merge(&config)?;
        }

        Commands::Show { what } => {
            let target = match what {
                ShowTarget::Policy { defs, dest } => commands::ShowTarget::Policy { defs, dest },
                ShowTarget::Db { dir, skip_shadow } => commands::ShowTarget::Db {
                    dir,
                    read_shadow: !skip_shadow,
                },
            };
            commands::cmd_show(target)?;
        }
    }

    Ok(())
}
