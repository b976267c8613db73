//! Commit, merge and push cycle for a site working tree

use std::fmt;

use comp_fs::lock::DEFAULT_POLL_INTERVAL;
use comp_fs::{FileLock, NormalizedPath};
use comp_git::{GitRepo, MergeOutcome, Upstream, aside_branch_name, merge_accept_mine};

use super::gitignore::{MANAGED_BLOCK_ID, ignore_entries};
use super::units::{ChangeUnit, ModuleResolver, group_changes};
use crate::cache::PackageCache;
use crate::context::AppContext;
use crate::events::Event;
use crate::jobs::JobKind;
use crate::manifest::LockState;
use crate::{Error, Result};

const GITIGNORE_COMMIT_MESSAGE: &str = "Update ignored managed packages";

/// Result of one merge/push cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub branch: String,
    pub outcome: MergeOutcome,
    pub pushed: bool,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let merge = match &self.outcome {
            MergeOutcome::UpToDate => "up to date".to_string(),
            MergeOutcome::FastForwarded => "fast-forwarded".to_string(),
            MergeOutcome::Replayed { commits, resolutions } => {
                format!("replayed {commits} commit(s), {} conflict(s) resolved", resolutions.len())
            }
        };
        let push = if self.pushed { "pushed" } else { "nothing to push" };
        write!(f, "{}: {merge}, {push}", self.branch)
    }
}

/// Keeps the site's working tree committed and pushed.
pub struct Synchronizer<'a> {
    ctx: &'a AppContext,
    repo: GitRepo,
}

impl<'a> Synchronizer<'a> {
    /// Open the repository containing the site root.
    ///
    /// Returns `None` when synchronization is disabled or the site is not
    /// inside a git working tree.
    pub fn open(ctx: &'a AppContext) -> Result<Option<Self>> {
        let git = &ctx.settings().git;
        if !git.enabled {
            tracing::debug!("Git synchronization disabled");
            return Ok(None);
        }
        match GitRepo::open(ctx.layout().root()) {
            Ok(repo) => Ok(Some(Self {
                repo: repo.with_network_timeout(git.network_timeout()),
                ctx,
            })),
            Err(comp_git::Error::NotARepository { .. }) => {
                tracing::debug!(root = %ctx.layout().root(), "Site is not a git working tree");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// `path` relative to the repository working directory.
    fn repo_relative(&self, path: &NormalizedPath) -> NormalizedPath {
        path.strip_prefix(self.repo.workdir())
            .unwrap_or_else(|| path.clone())
    }

    fn resolver(&self) -> Result<ModuleResolver> {
        let cache = PackageCache::new(self.ctx)?;
        let layout = self.ctx.layout();
        Ok(ModuleResolver::new(
            self.repo.workdir().clone(),
            self.repo_relative(&layout.plugins_dir()),
            self.repo_relative(&layout.themes_dir()),
            self.repo_relative(&layout.mu_plugins_dir()),
            cache.plugins()?,
            cache.themes()?,
        ))
    }

    /// Installer-owned package paths, repository-relative.
    ///
    /// Every plugin and theme the lock file lists plus every cached record.
    /// The lock is consulted so packages installed before the next cache
    /// refresh are already covered.
    fn managed_paths(&self) -> Result<Vec<NormalizedPath>> {
        let layout = self.ctx.layout();
        let cache = PackageCache::new(self.ctx)?;
        let mut paths: Vec<NormalizedPath> = ignore_entries(layout, &cache.plugins()?, &cache.themes()?)
            .iter()
            .map(|entry| layout.root().join(entry.trim_matches('/')))
            .collect();

        match LockState::read(&layout.lock_file()) {
            Ok(lock) => {
                let (plugins_dir, themes_dir) = (layout.plugins_dir(), layout.themes_dir());
                paths.extend(lock.packages.iter().chain(&lock.packages_dev).filter_map(|package| {
                    if package.is_plugin() {
                        Some(plugins_dir.join(package.short_name()))
                    } else if package.is_theme() {
                        Some(themes_dir.join(package.short_name()))
                    } else {
                        None
                    }
                }));
            }
            Err(Error::NotFound { .. }) => {}
            Err(e) => tracing::warn!(error = %e, "Lock file unreadable, excluding cached packages only"),
        }

        Ok(paths.iter().map(|path| self.repo_relative(path)).collect())
    }

    /// Uncommitted changes grouped into change units.
    ///
    /// The agent's own state directory and installer-managed packages never
    /// form a unit.
    pub fn pending_units(&self) -> Result<Vec<ChangeUnit>> {
        let status = self.repo.status()?;
        let mut exclude = vec![self.repo_relative(&self.ctx.layout().state_dir())];
        exclude.extend(self.managed_paths()?);
        Ok(group_changes(&status, &self.resolver()?, &exclude))
    }

    /// Rewrite the managed block of `.gitignore` from the package cache.
    ///
    /// When the block changed, the ignore file is committed on its own,
    /// newly ignored paths are dropped from the index, and a push is
    /// scheduled. Returns whether a commit was made.
    pub fn update_gitignore(&self) -> Result<bool> {
        let cache = PackageCache::new(self.ctx)?;
        let layout = self.ctx.layout();
        let entries = ignore_entries(layout, &cache.plugins()?, &cache.themes()?);

        let gitignore = layout.gitignore();
        if !comp_blocks::sync_block_in_file(&gitignore, MANAGED_BLOCK_ID, &entries)? {
            return Ok(false);
        }

        let site = self.repo_relative(layout.root());
        let untracked: Vec<String> = entries
            .iter()
            .map(|entry| site.join(entry.trim_matches('/')).as_str().to_string())
            .collect();
        let gitignore = self.repo_relative(&gitignore);

        self.repo.stage(&[gitignore.as_str()])?;
        if !untracked.is_empty() {
            let paths: Vec<&str> = untracked.iter().map(String::as_str).collect();
            self.repo.untrack(&paths)?;
        }
        if !self.repo.commit_index(GITIGNORE_COMMIT_MESSAGE)? {
            return Ok(false);
        }

        tracing::info!(entries = entries.len(), "Committed managed package ignore list");
        self.schedule_push()?;
        Ok(true)
    }

    /// Commit every pending change unit separately.
    ///
    /// Returns the number of commits made.
    pub fn commit_changes(&self) -> Result<usize> {
        let mut committed = 0;
        for unit in self.pending_units()? {
            let base = unit.base();
            self.repo.stage(&[base])?;
            let message = unit.commit_message();
            if self.repo.commit_paths(&message, &[base])? {
                tracing::info!(base = %base, action = %unit.action, message = %message, "Committed change unit");
                committed += 1;
            }
        }
        Ok(committed)
    }

    /// Queue a push job. Returns `false` when one is already pending.
    pub fn schedule_push(&self) -> Result<bool> {
        let scheduled = self.ctx.queue().schedule(JobKind::GitPush)?;
        if scheduled {
            tracing::debug!("Git push scheduled");
        }
        Ok(scheduled)
    }

    fn upstream(&self, branch: &str) -> Result<Upstream> {
        if let Some(upstream) = self.repo.upstream(branch)? {
            return Ok(upstream);
        }
        let fallback = Upstream {
            remote: self.ctx.settings().git.remote.clone(),
            branch: branch.to_string(),
        };
        self.repo.fetch(&fallback.remote)?;
        let tracking = fallback.tracking_ref();
        if self.repo.run(&["rev-parse", "--verify", "--quiet", &tracking])?.success() {
            tracing::debug!(branch = %branch, upstream = %tracking, "No tracking branch configured, using remote branch of the same name");
            return Ok(fallback);
        }
        Err(comp_git::Error::NoUpstream {
            branch: branch.to_string(),
        }
        .into())
    }

    fn lock(&self) -> Result<FileLock> {
        let path = self.ctx.layout().git_lock_file();
        FileLock::acquire(&path, self.ctx.settings().git.lock_timeout(), DEFAULT_POLL_INTERVAL).map_err(|e| match e {
            comp_fs::Error::LockTimeout { path, .. } => Error::LockTimeout { path },
            other => Error::Fs(other),
        })
    }

    /// Fetch, merge keeping local changes, then push.
    ///
    /// The fetch and merge run under the git lock; the push runs after it is
    /// released.
    ///
    /// # Errors
    ///
    /// - [`Error::LockTimeout`] when another cycle holds the lock too long
    /// - [`Error::MergeConflictUnresolved`] when a local commit could not be
    ///   replayed cleanly; the local branch is left as it was
    /// - [`Error::Git`] for fetch or push failures
    pub fn push_cycle(&self) -> Result<CycleReport> {
        let lock = self.lock()?;
        let branch = self
            .repo
            .current_branch()?
            .ok_or(comp_git::Error::DetachedHead)?;
        let upstream = self.upstream(&branch)?;
        self.repo.fetch(&upstream.remote)?;

        let outcome = match merge_accept_mine(&self.repo, &upstream) {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = Error::from(e);
                tracing::error!(branch = %branch, error = %err, "Merge failed, push skipped");
                self.ctx.publish(Event::GitCycleComplete { pushed: false });
                return Err(err);
            }
        };
        drop(lock);

        let ahead = self
            .repo
            .rev_list(&format!("{}..{}", upstream.tracking_ref(), branch))?;
        let pushed = !ahead.is_empty();
        if pushed {
            self.repo.push(&branch, &upstream)?;
            tracing::info!(branch = %branch, upstream = %upstream.tracking_ref(), commits = ahead.len(), "Pushed");
        } else {
            tracing::debug!(branch = %branch, "Nothing to push");
        }

        self.ctx.publish(Event::GitCycleComplete { pushed });
        Ok(CycleReport {
            branch,
            outcome,
            pushed,
        })
    }

    /// Ignore list, commits and push cycle, inline.
    pub fn sync_now(&self) -> Result<CycleReport> {
        self.update_gitignore()?;
        let committed = self.commit_changes()?;
        tracing::debug!(commits = committed, "Local changes committed");
        self.push_cycle()
    }

    /// Delete temporary merge branches left by interrupted cycles, then the
    /// git lock file itself.
    pub fn cleanup(&self) -> Result<()> {
        let lock = self.lock()?;
        let current = self.repo.current_branch()?;
        for branch in self.repo.local_branches()? {
            let Some(original) = branch.strip_suffix(&aside_branch_name("")) else {
                continue;
            };
            if current.as_deref() == Some(branch.as_str()) {
                continue;
            }
            self.repo.check(&["branch", "-D", &branch])?;
            tracing::info!(branch = %branch, original = %original, "Deleted stale merge branch");
        }
        let path = lock.path().clone();
        drop(lock);

        match std::fs::remove_file(path.to_native()) {
            Ok(()) => tracing::debug!(lock = %path, "Removed git lock file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(comp_fs::Error::io(path.to_native(), e).into()),
        }
        Ok(())
    }
}
