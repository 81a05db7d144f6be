//! Writing the merged database back out.
//!
//! All four files are rendered in memory first and written only then, so a
//! failure part way through removes what was already written instead of
//! leaving a torn result directory. passwd/group are world-readable,
//! shadow/gshadow are not, and the latter pair is handed to the shadow
//! group when the host has one.

use anyhow::{Context, Result};
use std::ffi::CString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::database::AccountDatabase;

/// Write passwd, group, shadow and gshadow under `dir`, creating it first
/// if needed. Existing files are replaced.
pub fn save(db: &AccountDatabase, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let files = [
        ("passwd", render_passwd(db), 0o644),
        ("group", render_group(db), 0o644),
        ("shadow", render_shadow(db), 0o640),
        ("gshadow", render_gshadow(db), 0o640),
    ];

    let mut written: Vec<PathBuf> = Vec::new();
    for (name, content, mode) in &files {
        let path = dir.join(name);
        if let Err(err) = write_file(&path, content, *mode) {
            // All or nothing: take back what this run already wrote.
            for path in &written {
                let _ = fs::remove_file(path);
            }
            return Err(err);
        }
        written.push(path);
    }

    fix_shadow_ownership(dir);
    Ok(())
}

fn write_file(path: &Path, content: &str, mode: u32) -> Result<()> {
    fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set mode on {}", path.display()))?;
    Ok(())
}

fn render_passwd(db: &AccountDatabase) -> String {
    let mut out = String::new();
    for u in db.users.values() {
        out.push_str(&format!(
            "{}:{}:{}:{}:{}:{}:{}\n",
            u.name, u.password, u.uid, u.gid, u.gecos, u.home, u.shell
        ));
    }
    out
}

fn render_group(db: &AccountDatabase) -> String {
    let mut out = String::new();
    for g in db.groups.values() {
        out.push_str(&format!(
            "{}:{}:{}:{}\n",
            g.name,
            g.password,
            g.gid,
            join_members(g.members.iter())
        ));
    }
    out
}

fn render_shadow(db: &AccountDatabase) -> String {
    let mut out = String::new();
    for u in db.users.values() {
        let s = &u.shadow;
        out.push_str(&format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{}\n",
            u.name,
            s.password,
            s.last_change,
            s.min_days,
            s.max_days,
            s.warn_days,
            s.inactive_days,
            s.expire_day,
            s.reserved
        ));
    }
    out
}

fn render_gshadow(db: &AccountDatabase) -> String {
    let mut out = String::new();
    for g in db.groups.values() {
        out.push_str(&format!(
            "{}:{}:{}:{}\n",
            g.name,
            g.shadow_password,
            g.admins,
            join_members(g.members.iter())
        ));
    }
    out
}

fn join_members<'a>(members: impl Iterator<Item = &'a String>) -> String {
    members.map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Hand shadow and gshadow to the shadow group when the host has one,
/// matching the layout shadow-utils leaves on a real system. Failures only
/// warn; the files already carry restrictive modes.
fn fix_shadow_ownership(dir: &Path) {
    let Some(gid) = shadow_gid() else {
        eprintln!("Warning: no shadow group on this host, leaving shadow file ownership alone");
        return;
    };
    for name in ["shadow", "gshadow"] {
        let path = dir.join(name);
        if let Err(err) = std::os::unix::fs::chown(&path, None, Some(gid)) {
            eprintln!("Warning: failed to chown {}: {}", path.display(), err);
        }
    }
}

fn shadow_gid() -> Option<u32> {
    let name = CString::new("shadow").ok()?;
    // getgrnam hands back a process-global record; this tool stays
    // single-threaded around the call.
    let group = unsafe { libc::getgrnam(name.as_ptr()) };
    if group.is_null() {
        None
    } else {
        Some(unsafe { (*group).gr_gid })
    }
}
