//! A working tree the agent commits into and synchronizes with its upstream.

use std::path::Path;
use std::time::Duration;

use comp_fs::NormalizedPath;
use git2::{BranchType, ErrorCode, Repository, RepositoryState};

use crate::command::{GitCommand, GitOutput};
use crate::status::{StatusEntry, parse_porcelain};
use crate::{Error, Result};

const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity used when the repository has no `user.name`/`user.email`.
const FALLBACK_NAME: &str = "Composition";
const FALLBACK_EMAIL: &str = "composition@localhost";

/// The remote-tracking branch a local branch follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    /// Remote name, e.g. `origin`.
    pub remote: String,
    /// Branch name on the remote, e.g. `main`.
    pub branch: String,
}

impl Upstream {
    /// The local remote-tracking ref, e.g. `origin/main`.
    pub fn tracking_ref(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }
}

/// A non-bare git repository rooted at a site directory.
pub struct GitRepo {
    repo: Repository,
    workdir: NormalizedPath,
    git: GitCommand,
    identity: Vec<String>,
    network_timeout: Duration,
}

impl GitRepo {
    /// Discover the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotARepository`] if `path` is not inside a working tree.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|_| Error::NotARepository {
            path: path.to_path_buf(),
        })?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| Error::NotARepository {
                path: path.to_path_buf(),
            })?
            .to_path_buf();

        let identity = if repo.signature().is_ok() {
            Vec::new()
        } else {
            tracing::debug!("No git identity configured, using fallback identity");
            vec![
                "-c".to_string(),
                format!("user.name={FALLBACK_NAME}"),
                "-c".to_string(),
                format!("user.email={FALLBACK_EMAIL}"),
            ]
        };

        let workdir_str = workdir.to_string_lossy();
        let workdir = NormalizedPath::new(workdir_str.trim_end_matches(['/', '\\']));

        Ok(Self {
            git: GitCommand::new(workdir.to_native()),
            repo,
            workdir,
            identity,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
        })
    }

    /// Bound the duration of fetch and push.
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    pub fn workdir(&self) -> &NormalizedPath {
        &self.workdir
    }

    pub fn command(&self) -> &GitCommand {
        &self.git
    }

    fn with_identity<'a>(&'a self, args: &[&'a str]) -> Vec<&'a str> {
        self.identity
            .iter()
            .map(String::as_str)
            .chain(args.iter().copied())
            .collect()
    }

    /// Run a git command with the repository's identity applied.
    pub fn run(&self, args: &[&str]) -> Result<GitOutput> {
        self.git.run(&self.with_identity(args))
    }

    /// Like [`GitRepo::run`] but fails on a nonzero exit code.
    pub fn check(&self, args: &[&str]) -> Result<GitOutput> {
        self.git.check(&self.with_identity(args))
    }

    /// Get the current branch name, or `None` when HEAD is detached or unborn.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(str::to_string))
        } else {
            Ok(None)
        }
    }

    /// The configured upstream of a local branch, if any.
    pub fn upstream(&self, branch: &str) -> Result<Option<Upstream>> {
        let refname = format!("refs/heads/{branch}");
        let remote = match self.repo.branch_upstream_remote(&refname) {
            Ok(buf) => buf.as_str().map(str::to_string),
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let merge = match self.repo.branch_upstream_merge(&refname) {
            Ok(buf) => buf.as_str().map(str::to_string),
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(match (remote, merge) {
            (Some(remote), Some(merge)) => Some(Upstream {
                remote,
                branch: merge.trim_start_matches("refs/heads/").to_string(),
            }),
            _ => None,
        })
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, BranchType::Local).is_ok()
    }

    /// Local branch names, sorted.
    pub fn local_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Whether a cherry-pick is stopped waiting for conflict resolution.
    pub fn cherry_pick_in_progress(&self) -> bool {
        matches!(
            self.repo.state(),
            RepositoryState::CherryPick | RepositoryState::CherryPickSequence
        )
    }

    /// Porcelain status of the working tree, untracked files listed individually.
    pub fn status(&self) -> Result<Vec<StatusEntry>> {
        let output = self.check(&["status", "--porcelain", "--untracked-files=all"])?;
        Ok(parse_porcelain(&output.lines))
    }

    /// Entries currently in an unmerged state.
    pub fn unmerged(&self) -> Result<Vec<StatusEntry>> {
        Ok(self
            .status()?
            .into_iter()
            .filter(|e| e.conflict().is_some())
            .collect())
    }

    /// Stage additions, modifications and deletions under the given paths.
    pub fn stage(&self, paths: &[&str]) -> Result<()> {
        let mut args = vec!["add", "-A", "--"];
        args.extend_from_slice(paths);
        self.check(&args)?;
        Ok(())
    }

    /// Remove paths from the index while keeping them on disk.
    pub fn untrack(&self, paths: &[&str]) -> Result<()> {
        let mut args = vec!["rm", "-r", "-q", "--cached", "--ignore-unmatch", "--"];
        args.extend_from_slice(paths);
        self.check(&args)?;
        Ok(())
    }

    /// Whether anything is staged under the given paths (everything when empty).
    pub fn has_staged_changes(&self, paths: &[&str]) -> Result<bool> {
        let mut args = vec!["diff", "--cached", "--quiet"];
        if self.head_commit().is_none() {
            // No HEAD yet: any index entry is a staged change
            let output = self.check(&["ls-files", "--cached"])?;
            return Ok(!output.lines.is_empty());
        }
        if !paths.is_empty() {
            args.push("--");
            args.extend_from_slice(paths);
        }
        let output = self.run(&args)?;
        match output.code {
            0 => Ok(false),
            1 => Ok(true),
            code => Err(Error::CommandFailed {
                args: args.join(" "),
                code,
                stderr: output.stderr,
            }),
        }
    }

    /// Commit what is staged under `paths` with `message`.
    ///
    /// Returns `false` without committing when nothing is staged there.
    pub fn commit_paths(&self, message: &str, paths: &[&str]) -> Result<bool> {
        if !self.has_staged_changes(paths)? {
            return Ok(false);
        }
        let mut args = vec!["commit", "-q", "--no-verify", "-m", message];
        if !paths.is_empty() {
            args.push("--");
            args.extend_from_slice(paths);
        }
        self.check(&args)?;
        Ok(true)
    }

    /// Commit everything staged. Returns `false` when the index matches HEAD.
    pub fn commit_index(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes(&[])? {
            return Ok(false);
        }
        self.check(&["commit", "-q", "--no-verify", "-m", message])?;
        Ok(true)
    }

    /// Commit the whole index, allowing an empty commit.
    pub fn commit_all_staged(&self, message: &str) -> Result<()> {
        self.check(&["commit", "-q", "--no-verify", "--allow-empty", "-m", message])?;
        Ok(())
    }

    /// Fetch a remote, bounded by the network timeout.
    pub fn fetch(&self, remote: &str) -> Result<()> {
        let args = ["fetch", "--quiet", "--prune", remote];
        let output = self.git.run_with_timeout(&args, self.network_timeout)?;
        if !output.success() {
            return Err(Error::CommandFailed {
                args: args.join(" "),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    /// Push `local_branch` to its upstream branch, bounded by the network timeout.
    pub fn push(&self, local_branch: &str, upstream: &Upstream) -> Result<()> {
        let refspec = format!("refs/heads/{}:refs/heads/{}", local_branch, upstream.branch);
        let args = ["push", "--quiet", upstream.remote.as_str(), refspec.as_str()];
        let output = self.git.run_with_timeout(&args, self.network_timeout)?;
        if !output.success() {
            return Err(Error::CommandFailed {
                args: args.join(" "),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    /// Commits in `range`, oldest first.
    pub fn rev_list(&self, range: &str) -> Result<Vec<String>> {
        let output = self.check(&["rev-list", "--reverse", range])?;
        Ok(output
            .lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    /// Full message of a commit.
    pub fn commit_message(&self, rev: &str) -> Result<String> {
        let output = self.check(&["log", "-1", "--format=%B", rev])?;
        Ok(output.stdout().trim_end().to_string())
    }

    /// Subject line of a commit.
    pub fn commit_subject(&self, rev: &str) -> Result<String> {
        let output = self.check(&["log", "-1", "--format=%s", rev])?;
        Ok(output.stdout().trim().to_string())
    }

    /// Object id of HEAD, `None` for an unborn branch.
    pub fn head_commit(&self) -> Option<String> {
        self.repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .map(|oid| oid.to_string())
    }

    /// Whether `path` (repository-relative) is tracked in the index.
    pub fn is_tracked(&self, path: &str) -> Result<bool> {
        let output = self.check(&["ls-files", "--", path])?;
        Ok(!output.lines.is_empty())
    }
}
