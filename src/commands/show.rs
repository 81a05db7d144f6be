//! Show command - displays information.

use anyhow::Result;
use std::path::PathBuf;

use crate::database::AccountDatabase;
use crate::policy::RangePolicy;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show the effective uid/gid range policy.
    Policy {
        defs: Option<PathBuf>,
        dest: Option<PathBuf>,
    },
    /// Show a summary of one database directory.
    Db { dir: PathBuf, read_shadow: bool },
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget) -> Result<()> {
    match target {
        ShowTarget::Policy { defs, dest } => {
            let policy = RangePolicy::resolve(defs.as_deref(), dest.as_deref())?;
            policy.print();
        }
        ShowTarget::Db { dir, read_shadow } => {
            let db = AccountDatabase::load(&dir, read_shadow)?;
            println!("{}", dir.display());
            println!("Users ({}):", db.users.len());
            for user in db.users.values() {
                println!(
                    "  {} uid={} gid={} group={} shell={}",
                    user.name, user.uid, user.gid, user.group, user.shell
                );
            }
            println!("Groups ({}):", db.groups.len());
            for group in db.groups.values() {
                let members: Vec<&str> = group.members.iter().map(String::as_str).collect();
                println!("  {} gid={} members={}", group.name, group.gid, members.join(","));
            }
        }
    }
    Ok(())
}
