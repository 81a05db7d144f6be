//! The merge engine.
//!
//! Five strictly ordered phases over the destination database, no branching
//! back: prune unmarked destination users, prune destination groups left
//! without members, transfer marked source users (with fatal uid/gid
//! collision checks) and their primary groups, merge secondary group
//! memberships under the gid-conflict tie-break policy, then clean up
//! orphaned members and empty groups. Uid/gid collisions abort the run;
//! every other anomaly is resolved by policy, warned about, and counted.

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::config::MergeConfig;
use crate::database::AccountDatabase;
use crate::policy::RangePolicy;
use crate::records::UserRecord;
use crate::relay;
use crate::select;

/// Counters and accumulated warnings from one merge run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    /// Unmarked regular destination users removed before the transfer.
    pub users_pruned: usize,
    /// Regular destination groups removed because no member survived pruning.
    pub groups_pruned: usize,
    /// Marked source users copied into the destination.
    pub users_transferred: usize,
    /// Source groups inserted into the destination wholesale.
    pub groups_transferred: usize,
    /// Source groups unioned into an existing destination group.
    pub groups_merged: usize,
    /// Same-name groups whose gid disagreed and was resolved by policy.
    pub gid_conflicts: usize,
    /// Member names dropped because no such destination user exists.
    pub unknown_members_dropped: usize,
    /// Member names dropped because the user is that group's primary user.
    pub primary_members_dropped: usize,
    /// Regular groups dropped in cleanup: empty and nobody's primary group.
    pub empty_groups_dropped: usize,
    /// Every warning emitted during the run, in order.
    pub warnings: Vec<String>,
}

impl MergeReport {
    fn warn(&mut self, message: String) {
        eprintln!("Warning: {}", message);
        self.warnings.push(message);
    }

    /// Print the run counters.
    pub fn print(&self) {
        println!("Merge summary:");
        println!(
            "  Users:  {} pruned, {} transferred",
            self.users_pruned, self.users_transferred
        );
        println!(
            "  Groups: {} pruned, {} transferred, {} merged",
            self.groups_pruned, self.groups_transferred, self.groups_merged
        );
        println!(
            "  Cleanup: {} unknown members, {} primary members, {} empty groups dropped",
            self.unknown_members_dropped, self.primary_members_dropped, self.empty_groups_dropped
        );
        if self.gid_conflicts > 0 {
            println!("  Gid conflicts resolved: {}", self.gid_conflicts);
        }
    }
}

/// Run the full merge: mark destination, prune, mark source, transfer,
/// reconcile memberships, clean up.
///
/// Consumes both databases and returns the destination mutated into the
/// merged result, plus the report. Nothing is written to disk here; on a
/// collision error the caller has no output to discard.
pub fn run(
    config: &MergeConfig,
    source: AccountDatabase,
    dest: AccountDatabase,
    policy: &RangePolicy,
) -> Result<(AccountDatabase, MergeReport)> {
    Merger {
        source,
        dest,
        policy,
        config,
        report: MergeReport::default(),
    }
    .run()
}

struct Merger<'a> {
    source: AccountDatabase,
    dest: AccountDatabase,
    policy: &'a RangePolicy,
    config: &'a MergeConfig,
    report: MergeReport,
}

impl Merger<'_> {
    fn run(mut self) -> Result<(AccountDatabase, MergeReport)> {
        select::mark(
            &mut self.dest,
            &self.config.dest_users,
            &self.config.dest_groups,
            self.policy,
        )?;
        self.prune_users();
        self.prune_empty_groups();
        self.mark_source()?;
        self.transfer_users()?;
        self.transfer_memberships();
        self.cleanup();
        Ok((self.dest, self.report))
    }

    /// Phase 1: delete every regular-range destination user that was not
    /// marked. Runs before the transfer so colliding ids can be reclaimed
    /// by incoming accounts. System users are never pruned.
    fn prune_users(&mut self) {
        let doomed: Vec<String> = self
            .dest
            .users
            .values()
            .filter(|u| self.policy.is_regular_uid(u.uid) && !u.marked)
            .map(|u| u.name.clone())
            .collect();
        for name in &doomed {
            self.dest.users.shift_remove(name);
        }
        self.report.users_pruned = doomed.len();
        if !self.config.quiet && !doomed.is_empty() {
            println!("  Pruned {} destination users", doomed.len());
        }
    }

    /// Phase 2: delete every regular-range destination group with no
    /// surviving member. Member sets still name pruned users at this point,
    /// so survival is checked against the remaining user table.
    fn prune_empty_groups(&mut self) {
        let doomed: Vec<String> = self
            .dest
            .groups
            .values()
            .filter(|g| self.policy.is_regular_gid(g.gid))
            .filter(|g| !g.members.iter().any(|m| self.dest.users.contains_key(m)))
            .map(|g| g.name.clone())
            .collect();
        for name in &doomed {
            self.dest.groups.shift_remove(name);
        }
        self.report.groups_pruned = doomed.len();
        if !self.config.quiet && !doomed.is_empty() {
            println!("  Pruned {} empty destination groups", doomed.len());
        }
    }

    /// Mark the source side. An entirely empty source selection defaults to
    /// every regular user; destination selection never defaults.
    fn mark_source(&mut self) -> Result<()> {
        let select_all =
            self.config.source_users.is_empty() && self.config.source_groups.is_empty();
        let (users, groups) = if select_all {
            (".*", "")
        } else {
            (
                self.config.source_users.as_str(),
                self.config.source_groups.as_str(),
            )
        };
        select::mark(&mut self.source, users, groups, self.policy)
    }

    /// Phase 3: copy every marked source user into the destination, along
    /// with its primary group. A same-name destination user with a
    /// different uid or gid, or a same-name primary group with a different
    /// gid, aborts the whole merge.
    fn transfer_users(&mut self) -> Result<()> {
        let sentinel = self
            .config
            .restricted
            .then(|| relay::relay_field(self.config.relay_password.as_deref()));

        let marked: Vec<UserRecord> = self
            .source
            .users
            .values()
            .filter(|u| u.marked)
            .cloned()
            .collect();

        for mut user in marked {
            if let Some(existing) = self.dest.users.get(&user.name) {
                if existing.uid != user.uid || existing.gid != user.gid {
                    bail!(
                        "collision: user '{}' is uid {} gid {} in the source but uid {} gid {} in the destination",
                        user.name,
                        user.uid,
                        user.gid,
                        existing.uid,
                        existing.gid
                    );
                }
            }

            // The primary group comes along under the same name. An equal-gid
            // destination group is kept as is; phase 4 unions the membership.
            let group = self
                .source
                .groups
                .get(&user.group)
                .cloned()
                .with_context(|| {
                    format!("Source group '{}' is missing for user '{}'", user.group, user.name)
                })?;
            match self.dest.groups.get(&group.name) {
                Some(existing) if existing.gid != group.gid => {
                    bail!(
                        "collision: group '{}' is gid {} in the source but gid {} in the destination",
                        group.name,
                        group.gid,
                        existing.gid
                    );
                }
                Some(_) => {}
                None => {
                    self.report.groups_transferred += 1;
                    self.dest.groups.insert(group.name.clone(), group);
                }
            }

            if let Some(ref field) = sentinel {
                user.shadow.password = field.clone();
            }
            self.report.users_transferred += 1;
            self.dest.users.insert(user.name.clone(), user);
        }

        if !self.config.quiet && self.report.users_transferred > 0 {
            println!("  Transferred {} source users", self.report.users_transferred);
        }
        Ok(())
    }

    /// Phase 4: merge every source group with at least one marked member
    /// into the destination. Same name and gid unions the member sets; a
    /// gid mismatch also unions but keeps the destination gid when it is a
    /// regular one and takes the source gid otherwise. Group credentials
    /// always come from the source.
    fn transfer_memberships(&mut self) {
        let candidates: Vec<_> = self
            .source
            .groups
            .values()
            .filter(|g| {
                g.members
                    .iter()
                    .any(|m| self.source.users.get(m).is_some_and(|u| u.marked))
            })
            .cloned()
            .collect();

        for group in candidates {
            if let Some(existing) = self.dest.groups.get_mut(&group.name) {
                if existing.gid != group.gid {
                    let kept = if self.policy.is_regular_gid(existing.gid) {
                        existing.gid
                    } else {
                        group.gid
                    };
                    self.report.gid_conflicts += 1;
                    self.report.warn(format!(
                        "group '{}' is gid {} in the source but gid {} in the destination; keeping gid {}",
                        group.name, group.gid, existing.gid, kept
                    ));
                    existing.gid = kept;
                }
                existing.password = group.password;
                existing.shadow_password = group.shadow_password;
                existing.admins = group.admins;
                existing.members.extend(group.members);
                self.report.groups_merged += 1;
            } else {
                self.report.groups_transferred += 1;
                self.dest.groups.insert(group.name.clone(), group);
            }
        }
    }

    /// Phase 5: drop group members that no longer exist or that are the
    /// group's own primary user (implicit membership must not be written
    /// out), then drop regular groups left empty that no surviving user
    /// designates as a primary group.
    fn cleanup(&mut self) {
        let users = &self.dest.users;
        let report = &mut self.report;
        for group in self.dest.groups.values_mut() {
            let gid = group.gid;
            let group_name = group.name.clone();
            group.members.retain(|member| match users.get(member) {
                None => {
                    report.unknown_members_dropped += 1;
                    report.warn(format!(
                        "group '{}': dropping unknown member '{}'",
                        group_name, member
                    ));
                    false
                }
                Some(user) if user.gid == gid => {
                    report.primary_members_dropped += 1;
                    false
                }
                Some(_) => true,
            });
        }

        let doomed: Vec<String> = self
            .dest
            .groups
            .values()
            .filter(|g| self.policy.is_regular_gid(g.gid) && g.members.is_empty())
            .filter(|g| !self.dest.users.values().any(|u| u.gid == g.gid))
            .map(|g| g.name.clone())
            .collect();
        for name in &doomed {
            self.dest.groups.shift_remove(name);
            self.report.warn(format!("dropping empty group '{}'", name));
        }
        self.report.empty_groups_dropped = doomed.len();
    }
}
