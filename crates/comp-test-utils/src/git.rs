//! Git repository fixtures.
//!
//! Choose the lowest-realism fixture that satisfies the test.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Run `git` in `dir`, panicking with stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run `git {args:?}`: {e}"));
    if !output.status.success() {
        panic!(
            "`git {args:?}` failed in {}:\n{}",
            dir.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// Initialises a repository on `main` with one commit containing `README.md`.
pub fn real_git_repo_with_commit(path: &Path) {
    git(path, &["init", "-q"]);
    configure_identity(path);
    fs::write(path.join("README.md"), "# Test").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-q", "-m", "Initial commit"]);
    git(path, &["branch", "-M", "main"]);
}

/// A bare `origin` plus two clones of it: the site under test and a second
/// "upstream" clone used to push competing changes.
pub struct RemotePair {
    pub origin: PathBuf,
    pub site: PathBuf,
    pub upstream: PathBuf,
}

impl RemotePair {
    /// Create the layout below `base`. Both clones track `origin/main` and
    /// share an initial commit.
    pub fn new(base: &Path) -> Self {
        let seed = base.join("seed");
        let origin = base.join("origin.git");
        let site = base.join("site");
        let upstream = base.join("upstream");
        fs::create_dir_all(&seed).unwrap();

        real_git_repo_with_commit(&seed);
        git(base, &["clone", "-q", "--bare", seed.to_str().unwrap(), origin.to_str().unwrap()]);
        for clone in [&site, &upstream] {
            git(base, &["clone", "-q", origin.to_str().unwrap(), clone.to_str().unwrap()]);
            configure_identity(clone);
        }
        fs::remove_dir_all(&seed).unwrap();

        Self {
            origin,
            site,
            upstream,
        }
    }

    /// Commit `files` (path, optional content; `None` deletes) in the upstream
    /// clone and push them to origin.
    pub fn push_upstream(&self, message: &str, files: &[(&str, Option<&str>)]) {
        write_files(&self.upstream, files);
        git(&self.upstream, &["add", "-A"]);
        git(&self.upstream, &["commit", "-q", "-m", message]);
        git(&self.upstream, &["push", "-q", "origin", "HEAD:main"]);
    }

    /// Commit `files` in the site clone without pushing.
    pub fn commit_site(&self, message: &str, files: &[(&str, Option<&str>)]) {
        write_files(&self.site, files);
        git(&self.site, &["add", "-A"]);
        git(&self.site, &["commit", "-q", "-m", message]);
    }

    /// Make every further commit in the site clone fail through a
    /// `prepare-commit-msg` hook, which `--no-verify` does not skip.
    #[cfg(unix)]
    pub fn reject_site_commits(&self) {
        use std::os::unix::fs::PermissionsExt;

        let hook = self.site.join(".git/hooks/prepare-commit-msg");
        fs::create_dir_all(hook.parent().unwrap()).unwrap();
        fs::write(&hook, "#!/bin/sh\necho 'commits disabled' >&2\nexit 1\n").unwrap();
        fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Fetch origin into the upstream clone and return `git log` subjects of
    /// `origin/main`, newest first.
    pub fn origin_subjects(&self) -> Vec<String> {
        git(&self.upstream, &["fetch", "-q", "origin"]);
        git(&self.upstream, &["log", "--format=%s", "origin/main"])
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn write_files(dir: &Path, files: &[(&str, Option<&str>)]) {
    for (path, content) in files {
        let full = dir.join(path);
        match content {
            Some(content) => {
                if let Some(parent) = full.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&full, content).unwrap();
            }
            None => {
                if full.is_dir() {
                    fs::remove_dir_all(&full).unwrap();
                } else {
                    fs::remove_file(&full).unwrap();
                }
            }
        }
    }
}
