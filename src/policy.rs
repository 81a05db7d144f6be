//! UID/GID range policy.
//!
//! Reads the regular-account ranges from a login.defs-style file. Ids inside
//! the ranges belong to ordinary accounts/groups; ids outside are system
//! accounts/groups, which the selector and the merge engine treat
//! differently.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Fallback lower bound for regular UIDs and GIDs.
pub const DEFAULT_ID_MIN: u32 = 1000;
/// Fallback upper bound for regular UIDs and GIDs.
pub const DEFAULT_ID_MAX: u32 = 60000;

/// The numeric bounds separating regular accounts/groups from system ones.
///
/// Loaded once per run and shared read-only by the selector and the merge
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePolicy {
    pub uid_min: u32,
    pub uid_max: u32,
    pub gid_min: u32,
    pub gid_max: u32,
}

impl Default for RangePolicy {
    fn default() -> Self {
        Self {
            uid_min: DEFAULT_ID_MIN,
            uid_max: DEFAULT_ID_MAX,
            gid_min: DEFAULT_ID_MIN,
            gid_max: DEFAULT_ID_MAX,
        }
    }
}

impl RangePolicy {
    /// Load the policy from a login.defs file.
    ///
    /// Lines are `KEY VALUE` separated by whitespace; `#` starts a comment.
    /// Only UID_MIN/UID_MAX/GID_MIN/GID_MAX are consulted, other keys are
    /// ignored. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut policy = Self::default();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let slot = match key {
                "UID_MIN" => &mut policy.uid_min,
                "UID_MAX" => &mut policy.uid_max,
                "GID_MIN" => &mut policy.gid_min,
                "GID_MAX" => &mut policy.gid_max,
                _ => continue,
            };
            *slot = value.parse().with_context(|| {
                format!("{}:{}: invalid {} '{}'", path.display(), idx + 1, key, value)
            })?;
        }

        Ok(policy)
    }

    /// Resolve the policy for a run.
    ///
    /// An explicit `defs` path must be readable. Otherwise the destination
    /// directory's own login.defs is preferred, then the host's
    /// /etc/login.defs, then the built-in defaults.
    pub fn resolve(defs: Option<&Path>, dest_dir: Option<&Path>) -> Result<Self> {
        if let Some(path) = defs {
            return Self::load(path);
        }
        if let Some(dir) = dest_dir {
            let local = dir.join("login.defs");
            if local.exists() {
                return Self::load(&local);
            }
        }
        let system = Path::new("/etc/login.defs");
        if system.exists() {
            return Self::load(system);
        }
        Ok(Self::default())
    }

    /// Whether a UID falls in the regular (non-system) account range.
    pub fn is_regular_uid(&self, uid: u32) -> bool {
        (self.uid_min..=self.uid_max).contains(&uid)
    }

    /// Whether a GID falls in the regular (non-system) group range.
    pub fn is_regular_gid(&self, gid: u32) -> bool {
        (self.gid_min..=self.gid_max).contains(&gid)
    }

    /// Print the effective ranges.
    pub fn print(&self) {
        println!("Range policy:");
        println!("  UID_MIN: {}", self.uid_min);
        println!("  UID_MAX: {}", self.uid_max);
        println!("  GID_MIN: {}", self.gid_min);
        println!("  GID_MAX: {}", self.gid_max);
    }
}
