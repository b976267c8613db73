//! Accept-mine merge against a real bare origin.

use std::fs;

use comp_git::{
    ConflictState, GitRepo, MergeOutcome, ResolutionNote, Upstream, aside_branch_name,
    merge_accept_mine,
};
use comp_test_utils::git::{RemotePair, git};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn origin_main() -> Upstream {
    Upstream {
        remote: "origin".to_string(),
        branch: "main".to_string(),
    }
}

fn fetched(pair: &RemotePair) -> GitRepo {
    let repo = GitRepo::open(&pair.site).unwrap();
    repo.fetch("origin").unwrap();
    repo
}

fn seeded() -> (TempDir, RemotePair) {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    pair.push_upstream("Add shared file", &[("shared.txt", Some("base\n"))]);
    git(&pair.site, &["pull", "-q", "origin", "main"]);
    (temp, pair)
}

#[test]
fn up_to_date_when_upstream_has_nothing_new() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    pair.commit_site("Local only", &[("local.txt", Some("x"))]);

    let repo = fetched(&pair);
    assert_eq!(
        merge_accept_mine(&repo, &origin_main()).unwrap(),
        MergeOutcome::UpToDate
    );
}

#[test]
fn fast_forwards_without_local_commits() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    pair.push_upstream("Remote change", &[("remote.txt", Some("r"))]);

    let repo = fetched(&pair);
    assert_eq!(
        merge_accept_mine(&repo, &origin_main()).unwrap(),
        MergeOutcome::FastForwarded
    );
    assert_eq!(fs::read_to_string(pair.site.join("remote.txt")).unwrap(), "r");
}

#[test]
fn replays_non_conflicting_commits_on_top_of_upstream() {
    let temp = TempDir::new().unwrap();
    let pair = RemotePair::new(temp.path());
    pair.push_upstream("Remote change", &[("remote.txt", Some("r"))]);
    pair.commit_site("Local change", &[("local.txt", Some("l"))]);

    let repo = fetched(&pair);
    let outcome = merge_accept_mine(&repo, &origin_main()).unwrap();
    assert_eq!(
        outcome,
        MergeOutcome::Replayed {
            commits: 1,
            resolutions: Vec::new(),
        }
    );

    assert!(pair.site.join("remote.txt").exists());
    assert!(pair.site.join("local.txt").exists());
    assert_eq!(repo.commit_subject("HEAD").unwrap(), "Local change");
    assert_eq!(repo.commit_subject("HEAD~1").unwrap(), "Remote change");
    assert!(!repo.branch_exists(&aside_branch_name("main")));
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("main"));
}

#[test]
fn local_modification_beats_remote_deletion() {
    let (_temp, pair) = seeded();
    pair.push_upstream("Remote delete", &[("shared.txt", None)]);
    pair.commit_site("Local modify", &[("shared.txt", Some("local\n"))]);

    let repo = fetched(&pair);
    let MergeOutcome::Replayed { resolutions, .. } =
        merge_accept_mine(&repo, &origin_main()).unwrap()
    else {
        panic!("expected a replay");
    };

    assert_eq!(resolutions.len(), 1);
    assert_eq!(resolutions[0].path, "shared.txt");
    assert_eq!(resolutions[0].state, ConflictState::DeletedByUs);
    assert_eq!(resolutions[0].note, ResolutionNote::Added);
    assert_eq!(
        fs::read_to_string(pair.site.join("shared.txt")).unwrap(),
        "local\n"
    );
    assert!(repo.is_tracked("shared.txt").unwrap());

    let message = repo.commit_message("HEAD").unwrap();
    assert!(message.starts_with("Local modify"));
    assert!(message.contains("Conflicts resolved:"));
    assert!(message.contains("[added] shared.txt"));
}

#[test]
fn local_deletion_beats_remote_modification() {
    let (_temp, pair) = seeded();
    pair.push_upstream("Remote modify", &[("shared.txt", Some("remote\n"))]);
    pair.commit_site("Local delete", &[("shared.txt", None)]);

    let repo = fetched(&pair);
    let MergeOutcome::Replayed { resolutions, .. } =
        merge_accept_mine(&repo, &origin_main()).unwrap()
    else {
        panic!("expected a replay");
    };

    assert_eq!(resolutions[0].state, ConflictState::DeletedByThem);
    assert_eq!(resolutions[0].note, ResolutionNote::Removed);
    assert!(!pair.site.join("shared.txt").exists());
    assert!(!repo.is_tracked("shared.txt").unwrap());
    assert!(
        repo.commit_message("HEAD")
            .unwrap()
            .contains("[removed] shared.txt")
    );
}

#[test]
fn both_modified_keeps_local_version() {
    let (_temp, pair) = seeded();
    pair.push_upstream("Remote edit", &[("shared.txt", Some("remote\n"))]);
    pair.commit_site("Local edit", &[("shared.txt", Some("local\n"))]);

    let repo = fetched(&pair);
    let MergeOutcome::Replayed { commits, resolutions } =
        merge_accept_mine(&repo, &origin_main()).unwrap()
    else {
        panic!("expected a replay");
    };

    assert_eq!(commits, 1);
    assert_eq!(resolutions[0].state, ConflictState::BothModified);
    assert_eq!(resolutions[0].note, ResolutionNote::LocalVersion);
    assert_eq!(
        fs::read_to_string(pair.site.join("shared.txt")).unwrap(),
        "local\n"
    );
    assert!(repo.status().unwrap().is_empty());
}

#[test]
fn merged_branch_can_be_pushed() {
    let (_temp, pair) = seeded();
    pair.push_upstream("Remote edit", &[("shared.txt", Some("remote\n"))]);
    pair.commit_site("Local edit", &[("shared.txt", Some("local\n"))]);

    let repo = fetched(&pair);
    merge_accept_mine(&repo, &origin_main()).unwrap();
    repo.push("main", &origin_main()).unwrap();

    assert_eq!(
        pair.origin_subjects()[..2],
        ["Local edit".to_string(), "Remote edit".to_string()]
    );
}

#[cfg(unix)]
#[test]
fn failed_replay_restores_original_branch() {
    let (_temp, pair) = seeded();
    pair.push_upstream("Remote edit", &[("shared.txt", Some("remote\n"))]);
    pair.commit_site("Local edit", &[("shared.txt", Some("local\n"))]);
    let local_head = git(&pair.site, &["rev-parse", "HEAD"]);
    pair.reject_site_commits();

    let repo = fetched(&pair);
    let err = merge_accept_mine(&repo, &origin_main()).unwrap_err();
    assert!(matches!(err, comp_git::Error::CommandFailed { .. }), "{err}");

    assert_eq!(git(&pair.site, &["rev-parse", "HEAD"]), local_head);
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("main"));
    assert!(!repo.branch_exists(&aside_branch_name("main")));
    assert!(!repo.cherry_pick_in_progress());
    assert_eq!(
        git(&pair.site, &["rev-parse", "--abbrev-ref", "main@{upstream}"]),
        "origin/main"
    );
    assert_eq!(
        fs::read_to_string(pair.site.join("shared.txt")).unwrap(),
        "local\n"
    );
}
