//! Typed representations of passwd/group/shadow/gshadow entries.
//!
//! One `UserRecord` carries a user's passwd line plus its shadow fields;
//! one `GroupRecord` carries a group line plus its gshadow fields. Records
//! that have no shadow/gshadow entry get the documented defaults instead
//! of optional fields.

use indexmap::IndexSet;

/// Hash written when no shadow/gshadow entry provides one. A lone "!"
/// cannot match any password, so accounts without shadow data stay locked.
pub const LOCKED_HASH: &str = "!";

/// Password-aging fields from a shadow entry.
///
/// Everything is kept as a string: the file format passes empty fields
/// through verbatim, and this tool never interprets day counts.
#[derive(Debug, Clone)]
pub struct ShadowFields {
    /// Hashed password (or a lock marker like "!" / "*").
    pub password: String,
    /// Days since epoch of the last password change.
    pub last_change: String,
    /// Minimum days between password changes.
    pub min_days: String,
    /// Maximum password age in days.
    pub max_days: String,
    /// Days of warning before expiration.
    pub warn_days: String,
    /// Days of inactivity allowed after expiration.
    pub inactive_days: String,
    /// Account expiration day.
    pub expire_day: String,
    /// Reserved field.
    pub reserved: String,
}

impl Default for ShadowFields {
    /// The record merged in when a user has no shadow entry: locked
    /// password, every aging field empty.
    fn default() -> Self {
        Self {
            password: LOCKED_HASH.to_string(),
            last_change: String::new(),
            min_days: String::new(),
            max_days: String::new(),
            warn_days: String::new(),
            inactive_days: String::new(),
            expire_day: String::new(),
            reserved: String::new(),
        }
    }
}

/// One user account: a passwd line, its shadow fields, and the working
/// state the merge phases need.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Login name (the key in `AccountDatabase::users`).
    pub name: String,
    /// Password field of the passwd line (usually "x").
    pub password: String,
    pub uid: u32,
    /// Primary group id.
    pub gid: u32,
    /// GECOS comment field.
    pub gecos: String,
    pub home: String,
    pub shell: String,
    /// Shadow entry, or `ShadowFields::default()` when absent.
    pub shadow: ShadowFields,
    /// Name of the primary group, resolved from `gid` at load time.
    pub group: String,
    /// Selection flag set by the marker; never cleared within a run.
    pub marked: bool,
}

/// One group: a group line plus its gshadow fields.
///
/// The gshadow member column is not stored; the group file's member set is
/// authoritative and the writer re-derives the column from it.
#[derive(Debug, Clone)]
pub struct GroupRecord {
    /// Group name (the key in `AccountDatabase::groups`).
    pub name: String,
    /// Password field of the group line (usually "x").
    pub password: String,
    pub gid: u32,
    /// Member login names, deduplicated, in input order. Every user's
    /// primary group implicitly contains that user; the loader inserts it.
    pub members: IndexSet<String>,
    /// Hashed password from gshadow, or "!" when absent.
    pub shadow_password: String,
    /// Administrator list from gshadow, kept as one opaque string.
    pub admins: String,
}
