//! Accept-mine merge: replay local commits on top of the upstream branch.
//!
//! The local branch is renamed aside, a fresh branch is created at the
//! upstream tip, and every local commit is cherry-picked onto it in order.
//! Conflicts are resolved in favour of the local commit. If any conflict
//! survives resolution the original branch is restored untouched.

use std::fmt;

use crate::repo::{GitRepo, Upstream};
use crate::status::ConflictState;
use crate::{Error, Result};

/// How a conflicting path was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionNote {
    Removed,
    Added,
    LocalVersion,
}

impl fmt::Display for ResolutionNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removed => write!(f, "[removed]"),
            Self::Added => write!(f, "[added]"),
            Self::LocalVersion => write!(f, "[local version]"),
        }
    }
}

/// One automatically resolved conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: String,
    pub state: ConflictState,
    pub note: ResolutionNote,
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Upstream has nothing the local branch lacks.
    UpToDate,
    /// No local commits; the branch moved to the upstream tip.
    FastForwarded,
    /// Local commits were replayed onto upstream.
    Replayed {
        commits: usize,
        resolutions: Vec<Resolution>,
    },
}

/// Name of the temporary branch the local branch is parked on during a merge.
pub fn aside_branch_name(branch: &str) -> String {
    format!("{branch}-composition-aside")
}

/// Merge the fetched upstream into the current branch, keeping local changes.
///
/// The caller is responsible for fetching beforehand and for holding the
/// critical-section lock.
///
/// # Errors
///
/// - [`Error::DetachedHead`] when no branch is checked out
/// - [`Error::MergeConflictUnresolved`] when a replayed commit could not be
///   brought to a clean state; the original branch is restored first
pub fn merge_accept_mine(repo: &GitRepo, upstream: &Upstream) -> Result<MergeOutcome> {
    let branch = repo.current_branch()?.ok_or(Error::DetachedHead)?;
    let tracking = upstream.tracking_ref();

    let remote_only = repo.rev_list(&format!("HEAD..{tracking}"))?;
    if remote_only.is_empty() {
        tracing::debug!(branch = %branch, upstream = %tracking, "Already up to date");
        return Ok(MergeOutcome::UpToDate);
    }

    let local_only = repo.rev_list(&format!("{tracking}..HEAD"))?;
    if local_only.is_empty() {
        repo.check(&["merge", "--ff-only", "-q", &tracking])?;
        tracing::info!(branch = %branch, upstream = %tracking, "Fast-forwarded to upstream");
        return Ok(MergeOutcome::FastForwarded);
    }

    let aside = aside_branch_name(&branch);
    if repo.branch_exists(&aside) {
        tracing::warn!(branch = %aside, "Removing stale aside branch");
        repo.check(&["branch", "-D", &aside])?;
    }

    repo.check(&["branch", "-m", &branch, &aside])?;
    if let Err(e) = repo.check(&["checkout", "-q", "-b", &branch, &tracking]) {
        run_logged(repo, &["branch", "-m", &aside, &branch]);
        tracing::error!(branch = %branch, error = %e, "Checkout of upstream failed, original branch restored");
        return Err(e);
    }
    run_logged(repo, &["branch", "-q", &format!("--set-upstream-to={tracking}")]);

    let mut resolutions = Vec::new();
    for commit in &local_only {
        match replay_commit(repo, commit) {
            Ok(mut resolved) => resolutions.append(&mut resolved),
            Err(e) => {
                restore_branch(repo, &branch, &aside);
                return Err(e);
            }
        }
    }

    repo.check(&["branch", "-D", &aside])?;
    tracing::info!(
        branch = %branch,
        upstream = %tracking,
        commits = local_only.len(),
        resolved = resolutions.len(),
        "Replayed local commits onto upstream"
    );

    Ok(MergeOutcome::Replayed {
        commits: local_only.len(),
        resolutions,
    })
}

fn replay_commit(repo: &GitRepo, commit: &str) -> Result<Vec<Resolution>> {
    let picked = repo.run(&["cherry-pick", "--keep-redundant-commits", commit])?;
    if picked.success() {
        return Ok(Vec::new());
    }

    if !repo.cherry_pick_in_progress() {
        return Err(Error::CommandFailed {
            args: format!("cherry-pick {commit}"),
            code: picked.code,
            stderr: picked.stderr,
        });
    }

    let mut resolutions = Vec::new();
    for entry in repo.unmerged()? {
        let Some(state) = entry.conflict() else {
            continue;
        };
        let note = resolve_path(repo, &entry.path, state)?;
        tracing::info!(path = %entry.path, code = state.code(), note = %note, "Resolved conflict");
        resolutions.push(Resolution {
            path: entry.path,
            state,
            note,
        });
    }

    let remaining = repo.unmerged()?;
    if !remaining.is_empty() {
        return Err(Error::MergeConflictUnresolved {
            commit: commit.to_string(),
            paths: remaining.into_iter().map(|e| e.path).collect(),
        });
    }

    let mut message = repo.commit_message(commit)?;
    if !resolutions.is_empty() {
        message.push_str("\n\nConflicts resolved:\n");
        for resolution in &resolutions {
            message.push_str(&format!("{} {}\n", resolution.note, resolution.path));
        }
    }
    repo.commit_all_staged(message.trim_end())?;

    Ok(resolutions)
}

/// Settle one unmerged path in favour of the replayed (local) commit.
///
/// During cherry-pick git calls the replayed commit "them", so keeping the
/// local version means taking stage 3.
fn resolve_path(repo: &GitRepo, path: &str, state: ConflictState) -> Result<ResolutionNote> {
    match state {
        ConflictState::BothDeleted | ConflictState::DeletedByThem => {
            repo.check(&["rm", "-q", "-f", "--ignore-unmatch", "--", path])?;
            Ok(ResolutionNote::Removed)
        }
        ConflictState::DeletedByUs | ConflictState::AddedByThem => {
            repo.check(&["add", "--", path])?;
            Ok(ResolutionNote::Added)
        }
        ConflictState::BothAdded | ConflictState::BothModified | ConflictState::AddedByUs => {
            if !repo.run(&["checkout", "--theirs", "--", path])?.success() {
                tracing::debug!(path = %path, "No local stage to check out, staging working copy");
            }
            repo.check(&["add", "--", path])?;
            Ok(ResolutionNote::LocalVersion)
        }
    }
}

/// Put the original branch back after a failed replay.
fn restore_branch(repo: &GitRepo, branch: &str, aside: &str) {
    let steps: [&[&str]; 4] = [
        &["cherry-pick", "--abort"],
        &["checkout", "-q", "-f", aside],
        &["branch", "-D", branch],
        &["branch", "-m", aside, branch],
    ];
    run_quiet(repo, steps[0]);
    for step in &steps[1..] {
        run_logged(repo, step);
    }
    tracing::error!(branch = %branch, "Merge aborted, original branch restored");
}

/// Run a best-effort git command, warning when it does not succeed.
fn run_logged(repo: &GitRepo, args: &[&str]) {
    match repo.run(args) {
        Ok(out) if out.success() => {}
        Ok(out) => tracing::warn!(args = %args.join(" "), code = out.code, stderr = %out.stderr, "Git command failed"),
        Err(e) => tracing::warn!(args = %args.join(" "), error = %e, "Git command failed"),
    }
}

/// Like [`run_logged`], but a nonzero exit is expected and only traced.
fn run_quiet(repo: &GitRepo, args: &[&str]) {
    match repo.run(args) {
        Ok(out) if !out.success() => tracing::debug!(args = %args.join(" "), stderr = %out.stderr, "Git command failed"),
        Ok(_) => {}
        Err(e) => tracing::warn!(args = %args.join(" "), error = %e, "Git command failed"),
    }
}
