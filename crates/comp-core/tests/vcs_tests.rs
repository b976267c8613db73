//! Tests for the Version Control Synchronizer against real git repositories

mod common;

use std::path::Path;
use std::time::Duration;

use comp_core::jobs::run_pending;
use comp_core::orchestrator::reinitialize;
use comp_core::vcs::{MANAGED_BLOCK_ID, ModuleKind};
use comp_core::{
    AppContext, Error, Event, JobKind, Orchestrator, PackageCache, SequenceOptions, Settings, Synchronizer,
};
use comp_fs::FileLock;
use comp_fs::lock::DEFAULT_POLL_INTERVAL;
use comp_git::{ChangeKind, MergeOutcome};
use comp_test_utils::git::{RemotePair, git};
use common::{FakeComposer, FakeHost};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

const EMPTY_BLOCK: &str = "*.log\n# BEGIN composition:managed-packages\n# END composition:managed-packages\n";

fn plugin_php(name: &str, version: &str) -> String {
    format!("<?php\n/**\n * Plugin Name: {name}\n * Version: {version}\n */\n")
}

fn commit_count(dir: &Path) -> usize {
    git(dir, &["rev-list", "--count", "HEAD"]).parse().unwrap()
}

fn head_subject(dir: &Path) -> String {
    git(dir, &["log", "-1", "--format=%s"])
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn write_lock(dir: &Path, plugins: &[&str], hash: &str) {
    let packages: Vec<_> = plugins
        .iter()
        .map(|slug| json!({"name": format!("wpackagist-plugin/{slug}"), "version": "1.0", "type": "wordpress-plugin"}))
        .collect();
    write(
        dir,
        "composer.lock",
        &json!({"content-hash": hash, "packages": packages}).to_string(),
    );
}

fn block_entries(dir: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(dir.join(".gitignore")).unwrap();
    comp_blocks::find_block(&content, MANAGED_BLOCK_ID)
        .unwrap()
        .entries()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn pending_kinds(ctx: &AppContext) -> Vec<JobKind> {
    ctx.queue().pending().unwrap().into_iter().map(|j| j.kind).collect()
}

#[test]
fn test_cache_refresh_regenerates_gitignore_with_one_commit_and_one_push() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    let foo = plugin_php("Foo", "1.0");
    pair.commit_site(
        "Site baseline",
        &[(".gitignore", Some(EMPTY_BLOCK)), ("wp-content/plugins/foo/foo.php", Some(&foo))],
    );
    write(&pair.site, "wp-content/plugins/bar/bar.php", &plugin_php("Bar", "2.0"));
    write_lock(&pair.site, &["foo", "bar"], "hash-1");

    let ctx = AppContext::new(pair.site.as_path(), Settings::default()).with_standard_subscribers();
    let before = commit_count(&pair.site);

    PackageCache::new(&ctx).unwrap().refresh(false).unwrap();
    ctx.dispatch_events();

    assert_eq!(
        block_entries(&pair.site),
        vec!["/wp-content/plugins/bar/", "/wp-content/plugins/foo/"]
    );
    assert_eq!(commit_count(&pair.site), before + 1);
    assert_eq!(head_subject(&pair.site), "Update ignored managed packages");
    assert_eq!(pending_kinds(&ctx), vec![JobKind::GitPush]);

    // Managed files leave the index but stay on disk
    assert_eq!(git(&pair.site, &["ls-files", "wp-content/plugins"]), "");
    assert!(pair.site.join("wp-content/plugins/foo/foo.php").is_file());

    // An unchanged ignore list commits nothing
    PackageCache::new(&ctx).unwrap().refresh(true).unwrap();
    ctx.dispatch_events();
    assert_eq!(commit_count(&pair.site), before + 1);
    assert_eq!(pending_kinds(&ctx), vec![JobKind::GitPush]);
}

#[test]
fn test_commit_changes_one_commit_per_unit() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    write(&pair.site, "README.md", "# Changed");
    write(&pair.site, "wp-content/plugins/custom/custom.php", &plugin_php("Custom Plugin", "0.2"));
    write(&pair.site, "wp-content/plugins/custom/readme.txt", "docs");
    write(&pair.site, "wp-content/mu-plugins/loader.php", "<?php\n");
    write(&pair.site, ".composition/options.json", "{}");

    let ctx = AppContext::new(pair.site.as_path(), Settings::default());
    let sync = Synchronizer::open(&ctx).unwrap().unwrap();

    let units = sync.pending_units().unwrap();
    let summary: Vec<(&str, ModuleKind, ChangeKind, usize)> = units
        .iter()
        .map(|u| (u.base(), u.module.kind, u.action, u.paths.len()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("README.md", ModuleKind::File, ChangeKind::Modified, 1),
            ("wp-content/mu-plugins/loader.php", ModuleKind::MuPlugin, ChangeKind::Added, 1),
            ("wp-content/plugins/custom", ModuleKind::Plugin, ChangeKind::Added, 2),
        ]
    );

    assert_eq!(sync.commit_changes().unwrap(), 3);
    let subjects: Vec<String> = git(&pair.site, &["log", "-3", "--format=%s"])
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(
        subjects,
        vec![
            "Add plugin Custom Plugin 0.2",
            "Add mu-plugin loader.php",
            "Update file README.md",
        ]
    );
    assert!(sync.pending_units().unwrap().is_empty());
}

#[test]
fn test_lock_listed_packages_never_form_units() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    write(&pair.site, "wp-content/plugins/akismet/akismet.php", &plugin_php("Akismet", "5.3.1"));
    write(&pair.site, "wp-content/themes/astra/style.css", "/*\nTheme Name: Astra\n*/\n");
    write(&pair.site, "wp-content/plugins/custom/custom.php", &plugin_php("Custom", "1.0"));
    write(
        &pair.site,
        "composer.lock",
        &json!({"content-hash": "hash-1", "packages": [
            {"name": "wpackagist-plugin/akismet", "version": "5.3.1", "type": "wordpress-plugin"},
            {"name": "wpackagist-theme/astra", "version": "4.6", "type": "wordpress-theme"},
        ]})
        .to_string(),
    );

    let ctx = AppContext::new(pair.site.as_path(), Settings::default());
    let sync = Synchronizer::open(&ctx).unwrap().unwrap();

    let bases: Vec<String> = sync
        .pending_units()
        .unwrap()
        .iter()
        .map(|u| u.base().to_string())
        .collect();
    assert_eq!(bases, vec!["composer.lock", "wp-content/plugins/custom"]);
}

#[test]
fn test_update_sequence_never_commits_installed_packages() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    pair.commit_site("Site baseline", &[(".gitignore", Some(EMPTY_BLOCK))]);
    let ctx = AppContext::new(pair.site.as_path(), Settings::default()).with_standard_subscribers();
    reinitialize(&ctx).unwrap();
    ctx.dispatch_events();

    // Files the installer extracts during the apply step
    write(&pair.site, "wp-content/plugins/akismet/akismet.php", &plugin_php("Akismet", "5.3.1"));
    let composer = FakeComposer::with_packages(&[("wpackagist-plugin/akismet", "5.3.1", "wordpress-plugin")]);
    let host = FakeHost::new(pair.site.join("wp-content/plugins"));

    let report = Orchestrator::new(&ctx, &composer, &host).run(SequenceOptions::default());
    assert!(report.success(), "{report}");

    let history = git(&pair.site, &["log", "--all", "--name-only", "--format="]);
    assert!(
        !history.contains("wp-content/plugins/akismet"),
        "installed package reached history:\n{history}"
    );
    assert_eq!(block_entries(&pair.site), vec!["/wp-content/plugins/akismet/"]);
    assert_eq!(git(&pair.site, &["ls-files", "wp-content"]), "");
    assert!(host.is_active("akismet/akismet.php"));
    assert_eq!(pending_kinds(&ctx), vec![JobKind::GitPush]);
}

#[test]
fn test_deleted_plugin_is_committed_as_delete() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    let old = plugin_php("Old Plugin", "3.1");
    pair.commit_site(
        "Add old plugin",
        &[
            ("wp-content/plugins/old/old.php", Some(&old)),
            ("wp-content/plugins/old/inc/helpers.php", Some("<?php\n")),
        ],
    );
    std::fs::remove_dir_all(pair.site.join("wp-content/plugins/old")).unwrap();

    let ctx = AppContext::new(pair.site.as_path(), Settings::default());
    let sync = Synchronizer::open(&ctx).unwrap().unwrap();

    assert_eq!(sync.commit_changes().unwrap(), 1);
    assert_eq!(head_subject(&pair.site), "Delete plugin old");
    assert_eq!(git(&pair.site, &["status", "--porcelain"]), "");
}

#[test]
fn test_push_cycle_replays_and_pushes() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    pair.push_upstream("Remote change", &[("remote.txt", Some("remote"))]);
    pair.commit_site("Local change", &[("local.txt", Some("local"))]);

    let ctx = AppContext::new(pair.site.as_path(), Settings::default());
    let sync = Synchronizer::open(&ctx).unwrap().unwrap();
    let report = sync.push_cycle().unwrap();

    assert!(report.pushed);
    assert!(matches!(report.outcome, MergeOutcome::Replayed { commits: 1, .. }));
    assert_eq!(
        pair.origin_subjects(),
        vec!["Local change", "Remote change", "Initial commit"]
    );
    assert!(pair.site.join("remote.txt").is_file());
    assert_eq!(
        ctx.events().pending(),
        vec![Event::GitCycleComplete { pushed: true }]
    );
}

#[test]
fn test_push_cycle_keeps_local_modification_over_remote_deletion() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    pair.push_upstream("Add shared", &[("shared.txt", Some("base"))]);
    git(&pair.site, &["pull", "-q", "origin", "main"]);
    pair.push_upstream("Remove shared", &[("shared.txt", None)]);
    pair.commit_site("Edit shared", &[("shared.txt", Some("mine"))]);

    let ctx = AppContext::new(pair.site.as_path(), Settings::default());
    let sync = Synchronizer::open(&ctx).unwrap().unwrap();
    sync.push_cycle().unwrap();

    assert_eq!(std::fs::read_to_string(pair.site.join("shared.txt")).unwrap(), "mine");
    git(&pair.upstream, &["pull", "-q", "origin", "main"]);
    assert_eq!(std::fs::read_to_string(pair.upstream.join("shared.txt")).unwrap(), "mine");
}

#[cfg(unix)]
#[test]
fn test_failed_replay_skips_push_and_restores_branch() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    pair.push_upstream("Add shared", &[("shared.txt", Some("base"))]);
    git(&pair.site, &["pull", "-q", "origin", "main"]);
    pair.push_upstream("Remote edit", &[("shared.txt", Some("theirs"))]);
    pair.commit_site("Local edit", &[("shared.txt", Some("mine"))]);
    let local_head = git(&pair.site, &["rev-parse", "HEAD"]);
    pair.reject_site_commits();

    let ctx = AppContext::new(pair.site.as_path(), Settings::default());
    let sync = Synchronizer::open(&ctx).unwrap().unwrap();

    assert!(matches!(sync.push_cycle(), Err(Error::Git(_))));

    assert_eq!(git(&pair.site, &["rev-parse", "main"]), local_head);
    assert_eq!(git(&pair.site, &["branch", "--format=%(refname:short)"]), "main");
    assert_eq!(pair.origin_subjects(), vec!["Remote edit", "Add shared", "Initial commit"]);
    assert_eq!(
        ctx.events().pending(),
        vec![Event::GitCycleComplete { pushed: false }]
    );
    // The lock was released
    FileLock::acquire(&ctx.layout().git_lock_file(), Duration::ZERO, DEFAULT_POLL_INTERVAL).unwrap();
}

#[test]
fn test_push_cycle_with_nothing_to_do() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    let ctx = AppContext::new(pair.site.as_path(), Settings::default());
    let sync = Synchronizer::open(&ctx).unwrap().unwrap();

    let report = sync.push_cycle().unwrap();

    assert_eq!(report.outcome, MergeOutcome::UpToDate);
    assert!(!report.pushed);
}

#[test]
fn test_push_cycle_times_out_on_held_lock() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    pair.commit_site("Local change", &[("local.txt", Some("local"))]);
    let mut settings = Settings::default();
    settings.git.lock_timeout_secs = Some(0);
    let ctx = AppContext::new(pair.site.as_path(), settings);

    let _held = FileLock::acquire(&ctx.layout().git_lock_file(), Duration::from_secs(1), DEFAULT_POLL_INTERVAL).unwrap();
    let sync = Synchronizer::open(&ctx).unwrap().unwrap();

    assert!(matches!(sync.push_cycle(), Err(Error::LockTimeout { .. })));
    assert_eq!(pair.origin_subjects(), vec!["Initial commit"]);
}

#[test]
fn test_open_without_repository_or_when_disabled() {
    let temp = TempDir::new().unwrap();
    let ctx = AppContext::new(temp.path(), Settings::default());
    assert!(Synchronizer::open(&ctx).unwrap().is_none());

    let pair_dir = TempDir::new().unwrap();
    let pair = RemotePair::new(pair_dir.path());
    let mut settings = Settings::default();
    settings.git.enabled = false;
    let ctx = AppContext::new(pair.site.as_path(), settings);
    assert!(Synchronizer::open(&ctx).unwrap().is_none());
}

#[test]
fn test_cleanup_removes_aside_branches_and_lock_file() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    git(&pair.site, &["branch", "main-composition-aside"]);
    git(&pair.site, &["branch", "feature"]);
    let ctx = AppContext::new(pair.site.as_path(), Settings::default());
    write(&pair.site, ".composition/git.lock", "");

    Synchronizer::open(&ctx).unwrap().unwrap().cleanup().unwrap();

    let branches = git(&pair.site, &["branch", "--format=%(refname:short)"]);
    let mut branches: Vec<&str> = branches.lines().collect();
    branches.sort();
    assert_eq!(branches, vec!["feature", "main"]);
    assert!(!pair.site.join(".composition/git.lock").exists());
}

#[test]
fn test_activation_event_commits_and_push_job_publishes() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    write(&pair.site, "wp-content/plugins/custom/custom.php", &plugin_php("Custom", "1.0"));
    let ctx = AppContext::new(pair.site.as_path(), Settings::default()).with_standard_subscribers();

    ctx.publish(Event::PluginActivated {
        plugin: "custom/custom.php".to_string(),
    });
    ctx.dispatch_events();

    assert_eq!(head_subject(&pair.site), "Add plugin Custom 1.0");
    assert_eq!(pending_kinds(&ctx), vec![JobKind::GitPush]);

    let results = run_pending(&ctx).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].success, "{:?}", results[0].message);
    assert_eq!(pair.origin_subjects(), vec!["Add plugin Custom 1.0", "Initial commit"]);
    assert!(pending_kinds(&ctx).is_empty());
}
