//! Account database loading.
//!
//! Reads passwd/group (and optionally shadow/gshadow) from one directory
//! into insertion-ordered name → record maps, resolves each user's primary
//! group name, and inserts each user into its primary group's member set.
//! Loading has no side effects beyond reads; the merge phases mutate the
//! loaded maps in place.

use anyhow::{bail, Context, Result};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::records::{GroupRecord, ShadowFields, UserRecord, LOCKED_HASH};

/// The user and group tables loaded from one directory.
///
/// Two instances exist per merge run: the source and the destination. The
/// destination is mutated in place into the merged result.
#[derive(Debug, Clone, Default)]
pub struct AccountDatabase {
    pub users: IndexMap<String, UserRecord>,
    pub groups: IndexMap<String, GroupRecord>,
}

impl AccountDatabase {
    /// Load passwd and group from `dir`, plus shadow and gshadow when
    /// `read_shadow` is set (absent shadow data then gets the documented
    /// defaults instead).
    ///
    /// Wrong field counts, non-numeric ids, and unresolvable primary groups
    /// are fatal. Shadow/gshadow entries for unknown names are ignored.
    pub fn load(dir: &Path, read_shadow: bool) -> Result<Self> {
        let mut db = Self {
            users: parse_passwd(&read_table(dir, "passwd")?, &dir.join("passwd"))?,
            groups: parse_group(&read_table(dir, "group")?, &dir.join("group"))?,
        };

        if read_shadow {
            apply_shadow(&mut db.users, &read_table(dir, "shadow")?, &dir.join("shadow"))?;
            apply_gshadow(&mut db.groups, &read_table(dir, "gshadow")?, &dir.join("gshadow"))?;
        }

        db.cross_link()?;
        Ok(db)
    }

    /// Resolve every user's primary group name and make the user an
    /// implicit member of that group. Fails if a user's gid has no group.
    fn cross_link(&mut self) -> Result<()> {
        // Later entries win when two groups share a gid.
        let mut by_gid: HashMap<u32, String> = HashMap::new();
        for group in self.groups.values() {
            by_gid.insert(group.gid, group.name.clone());
        }

        for user in self.users.values_mut() {
            let Some(group_name) = by_gid.get(&user.gid) else {
                bail!(
                    "User '{}' has primary gid {} with no matching group",
                    user.name,
                    user.gid
                );
            };
            user.group = group_name.clone();
            if let Some(group) = self.groups.get_mut(group_name) {
                group.members.insert(user.name.clone());
            }
        }
        Ok(())
    }
}

fn read_table(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Split one line into exactly `expected` colon-separated fields.
fn split_fields<'a>(
    line: &'a str,
    expected: usize,
    path: &Path,
    lineno: usize,
) -> Result<Vec<&'a str>> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() != expected {
        bail!(
            "{}:{}: expected {} colon-separated fields, found {}",
            path.display(),
            lineno,
            expected,
            fields.len()
        );
    }
    Ok(fields)
}

fn parse_id(field: &str, what: &str, path: &Path, lineno: usize) -> Result<u32> {
    field
        .parse()
        .with_context(|| format!("{}:{}: invalid {} '{}'", path.display(), lineno, what, field))
}

/// Parse a passwd file: 7 fields per line, indexed by name, last entry
/// wins on duplicate names.
fn parse_passwd(content: &str, path: &Path) -> Result<IndexMap<String, UserRecord>> {
    let mut users = IndexMap::new();
    for (idx, line) in content.lines().enumerate() {
        let f = split_fields(line, 7, path, idx + 1)?;
        let user = UserRecord {
            name: f[0].to_string(),
            password: f[1].to_string(),
            uid: parse_id(f[2], "uid", path, idx + 1)?,
            gid: parse_id(f[3], "gid", path, idx + 1)?,
            gecos: f[4].to_string(),
            home: f[5].to_string(),
            shell: f[6].to_string(),
            shadow: ShadowFields::default(),
            group: String::new(),
            marked: false,
        };
        users.insert(user.name.clone(), user);
    }
    Ok(users)
}

/// Parse a group file: 4 fields per line; the member field is comma-split
/// with empty names discarded.
fn parse_group(content: &str, path: &Path) -> Result<IndexMap<String, GroupRecord>> {
    let mut groups = IndexMap::new();
    for (idx, line) in content.lines().enumerate() {
        let f = split_fields(line, 4, path, idx + 1)?;
        let members: IndexSet<String> = f[3]
            .split(',')
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
        let group = GroupRecord {
            name: f[0].to_string(),
            password: f[1].to_string(),
            gid: parse_id(f[2], "gid", path, idx + 1)?,
            members,
            shadow_password: LOCKED_HASH.to_string(),
            admins: String::new(),
        };
        groups.insert(group.name.clone(), group);
    }
    Ok(groups)
}

/// Fill in shadow fields from a shadow file: 9 fields per line; entries
/// for names not in the passwd file are skipped.
fn apply_shadow(
    users: &mut IndexMap<String, UserRecord>,
    content: &str,
    path: &Path,
) -> Result<()> {
    for (idx, line) in content.lines().enumerate() {
        let f = split_fields(line, 9, path, idx + 1)?;
        let Some(user) = users.get_mut(f[0]) else {
            continue;
        };
        user.shadow = ShadowFields {
            password: f[1].to_string(),
            last_change: f[2].to_string(),
            min_days: f[3].to_string(),
            max_days: f[4].to_string(),
            warn_days: f[5].to_string(),
            inactive_days: f[6].to_string(),
            expire_day: f[7].to_string(),
            reserved: f[8].to_string(),
        };
    }
    Ok(())
}

/// Fill in gshadow fields: 4 fields per line; the member column is ignored
/// because the group file's member set is authoritative.
fn apply_gshadow(
    groups: &mut IndexMap<String, GroupRecord>,
    content: &str,
    path: &Path,
) -> Result<()> {
    for (idx, line) in content.lines().enumerate() {
        let f = split_fields(line, 4, path, idx + 1)?;
        let Some(group) = groups.get_mut(f[0]) else {
            continue;
        };
        group.shadow_password = f[1].to_string();
        group.admins = f[2].to_string();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_passwd_seven_fields() {
        let path = Path::new("passwd");
        let users = parse_passwd("alice:x:2000:2000:Alice:/home/alice:/bin/bash\n", path).unwrap();
        let alice = &users["alice"];
        assert_eq!(alice.uid, 2000);
        assert_eq!(alice.gid, 2000);
        assert_eq!(alice.shell, "/bin/bash");
        assert_eq!(alice.shadow.password, LOCKED_HASH);
        assert!(!alice.marked);
    }

    #[test]
    fn test_parse_passwd_wrong_field_count() {
        let path = Path::new("passwd");
        let err = parse_passwd("alice:x:2000:2000:/home/alice:/bin/bash\n", path).unwrap_err();
        assert!(err.to_string().contains("passwd:1"));
        assert!(err.to_string().contains("expected 7"));
    }

    #[test]
    fn test_parse_passwd_blank_line_is_malformed() {
        let path = Path::new("passwd");
        assert!(parse_passwd("\n", path).is_err());
    }

    #[test]
    fn test_parse_passwd_non_numeric_uid() {
        let path = Path::new("passwd");
        let err = parse_passwd("alice:x:abc:2000:Alice:/home/alice:/bin/bash\n", path).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid uid 'abc'"));
    }

    #[test]
    fn test_parse_passwd_duplicate_name_last_wins() {
        let path = Path::new("passwd");
        let users = parse_passwd(
            "bob:x:2001:2001:Bob:/home/bob:/bin/sh\nbob:x:2002:2002:Bob:/home/bob:/bin/bash\n",
            path,
        )
        .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users["bob"].uid, 2002);
    }

    #[test]
    fn test_parse_group_members_split_and_dedup() {
        let path = Path::new("group");
        let groups = parse_group("staff:x:2000:alice,,bob,alice\n", path).unwrap();
        let staff = &groups["staff"];
        assert_eq!(staff.gid, 2000);
        let members: Vec<&str> = staff.members.iter().map(String::as_str).collect();
        assert_eq!(members, ["alice", "bob"]);
    }

    #[test]
    fn test_apply_shadow_fills_fields_and_skips_unknown() {
        let path = Path::new("shadow");
        let mut users = parse_passwd(
            "alice:x:2000:2000:Alice:/home/alice:/bin/bash\n",
            Path::new("passwd"),
        )
        .unwrap();
        apply_shadow(
            &mut users,
            "alice:$6$h:19000:0:99999:7:::\nghost:!:19000:0:99999:7:::\n",
            path,
        )
        .unwrap();
        assert_eq!(users["alice"].shadow.password, "$6$h");
        assert_eq!(users["alice"].shadow.max_days, "99999");
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_apply_shadow_wrong_field_count() {
        let path = Path::new("shadow");
        let mut users = IndexMap::new();
        let err = apply_shadow(&mut users, "alice:!:19000:0:99999:7::\n", path).unwrap_err();
        assert!(err.to_string().contains("expected 9"));
    }

    #[test]
    fn test_apply_gshadow_ignores_member_column() {
        let path = Path::new("gshadow");
        let mut groups = parse_group("staff:x:2000:alice\n", Path::new("group")).unwrap();
        apply_gshadow(&mut groups, "staff:!:root:ghost,who\n", path).unwrap();
        let staff = &groups["staff"];
        assert_eq!(staff.shadow_password, "!");
        assert_eq!(staff.admins, "root");
        assert!(!staff.members.contains("ghost"));
    }

    #[test]
    fn test_cross_link_resolves_primary_group_and_membership() {
        let mut db = AccountDatabase {
            users: parse_passwd(
                "alice:x:2000:2000:Alice:/home/alice:/bin/bash\n",
                Path::new("passwd"),
            )
            .unwrap(),
            groups: parse_group("alice:x:2000:\n", Path::new("group")).unwrap(),
        };
        db.cross_link().unwrap();
        assert_eq!(db.users["alice"].group, "alice");
        assert!(db.groups["alice"].members.contains("alice"));
    }

    #[test]
    fn test_cross_link_missing_primary_group_is_fatal() {
        let mut db = AccountDatabase {
            users: parse_passwd(
                "alice:x:2000:2000:Alice:/home/alice:/bin/bash\n",
                Path::new("passwd"),
            )
            .unwrap(),
            groups: IndexMap::new(),
        };
        let err = db.cross_link().unwrap_err();
        assert!(err.to_string().contains("no matching group"));
    }
}
