//! Regex marking of the accounts that participate in a merge.
//!
//! Marking operates on one database at a time: once on the destination
//! (what survives pruning) and once on the source (what gets transferred).
//! Patterns match the full name, never a substring. Flags accumulate — a
//! second `mark` call never clears what an earlier one set.

use anyhow::{Context, Result};
use regex::Regex;

use crate::database::AccountDatabase;
use crate::policy::RangePolicy;

/// Mark every user selected by the given patterns.
///
/// An empty pattern selects nothing. A non-empty group pattern is matched
/// against regular group names directly and against system group names with
/// a ":" prefixed on the candidate side, so ":sudo" can only select the
/// system group sudo and "a.*" can only select regular groups. All members
/// of a matching group are marked, whatever their own uid. A non-empty user
/// pattern marks regular-range users whose name matches; system users are
/// never selected by name.
pub fn mark(
    db: &mut AccountDatabase,
    user_pattern: &str,
    group_pattern: &str,
    policy: &RangePolicy,
) -> Result<()> {
    if !group_pattern.is_empty() {
        let re = anchored(group_pattern)?;
        let AccountDatabase { users, groups } = db;
        for group in groups.values() {
            let matched = if policy.is_regular_gid(group.gid) {
                re.is_match(&group.name)
            } else {
                re.is_match(&format!(":{}", group.name))
            };
            if !matched {
                continue;
            }
            for member in &group.members {
                if let Some(user) = users.get_mut(member) {
                    user.marked = true;
                }
            }
        }
    }

    if !user_pattern.is_empty() {
        let re = anchored(user_pattern)?;
        for user in db.users.values_mut() {
            if policy.is_regular_uid(user.uid) && re.is_match(&user.name) {
                user.marked = true;
            }
        }
    }

    Ok(())
}

/// Compile a pattern anchored to match the whole candidate string.
fn anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .with_context(|| format!("Invalid regex '{}'", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::AccountDatabase;
    use crate::records::{GroupRecord, ShadowFields, UserRecord, LOCKED_HASH};
    use indexmap::IndexSet;

    fn user(name: &str, uid: u32, gid: u32) -> UserRecord {
        UserRecord {
            name: name.to_string(),
            password: "x".to_string(),
            uid,
            gid,
            gecos: String::new(),
            home: format!("/home/{}", name),
            shell: "/bin/bash".to_string(),
            shadow: ShadowFields::default(),
            group: String::new(),
            marked: false,
        }
    }

    fn group(name: &str, gid: u32, members: &[&str]) -> GroupRecord {
        GroupRecord {
            name: name.to_string(),
            password: "x".to_string(),
            gid,
            members: members.iter().map(|m| m.to_string()).collect::<IndexSet<_>>(),
            shadow_password: LOCKED_HASH.to_string(),
            admins: String::new(),
        }
    }

    fn sample_db() -> AccountDatabase {
        let mut db = AccountDatabase::default();
        for u in [user("alice", 2000, 2000), user("bob", 2001, 2001), user("root-admin", 999, 27)] {
            db.users.insert(u.name.clone(), u);
        }
        for g in [
            group("alice", 2000, &["alice"]),
            group("bob", 2001, &["bob"]),
            group("sudo", 27, &["root-admin", "alice"]),
        ] {
            db.groups.insert(g.name.clone(), g);
        }
        db
    }

    fn marked(db: &AccountDatabase) -> Vec<&str> {
        db.users
            .values()
            .filter(|u| u.marked)
            .map(|u| u.name.as_str())
            .collect()
    }

    #[test]
    fn test_user_pattern_is_full_match() {
        let policy = RangePolicy::default();
        let mut db = sample_db();
        mark(&mut db, "ali", "", &policy).unwrap();
        assert!(marked(&db).is_empty());
        mark(&mut db, "ali.*", "", &policy).unwrap();
        assert_eq!(marked(&db), ["alice"]);
    }

    #[test]
    fn test_user_pattern_never_matches_system_users() {
        let policy = RangePolicy::default();
        let mut db = sample_db();
        mark(&mut db, ".*", "", &policy).unwrap();
        assert_eq!(marked(&db), ["alice", "bob"]);
    }

    #[test]
    fn test_system_group_needs_colon_prefix() {
        let policy = RangePolicy::default();
        let mut db = sample_db();
        mark(&mut db, "", "sudo", &policy).unwrap();
        assert!(marked(&db).is_empty());
        mark(&mut db, "", ":sudo", &policy).unwrap();
        assert_eq!(marked(&db), ["alice", "root-admin"]);
    }

    #[test]
    fn test_group_pattern_matches_regular_groups_directly() {
        let policy = RangePolicy::default();
        let mut db = sample_db();
        mark(&mut db, "", "b.*", &policy).unwrap();
        assert_eq!(marked(&db), ["bob"]);
    }

    #[test]
    fn test_empty_patterns_select_nothing() {
        let policy = RangePolicy::default();
        let mut db = sample_db();
        mark(&mut db, "", "", &policy).unwrap();
        assert!(marked(&db).is_empty());
    }

    #[test]
    fn test_marking_is_idempotent() {
        let policy = RangePolicy::default();
        let mut db = sample_db();
        mark(&mut db, "alice|bob", "", &policy).unwrap();
        let once = marked(&db).len();
        mark(&mut db, "alice|bob", "", &policy).unwrap();
        assert_eq!(marked(&db).len(), once);
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let policy = RangePolicy::default();
        let mut db = sample_db();
        // Without the non-capturing group this would parse as ^alice or b$.
        mark(&mut db, "alice|b", "", &policy).unwrap();
        assert_eq!(marked(&db), ["alice"]);
    }

    #[test]
    fn test_invalid_regex_is_fatal() {
        let policy = RangePolicy::default();
        let mut db = sample_db();
        let err = mark(&mut db, "(", "", &policy).unwrap_err();
        assert!(err.to_string().contains("Invalid regex"));
    }

    #[test]
    fn test_unknown_group_members_are_skipped() {
        let policy = RangePolicy::default();
        let mut db = sample_db();
        db.groups
            .get_mut("bob")
            .unwrap()
            .members
            .insert("ghost".to_string());
        mark(&mut db, "", "bob", &policy).unwrap();
        assert_eq!(marked(&db), ["bob"]);
    }
}
