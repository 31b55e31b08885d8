use std::os::unix::fs::symlink;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

use super::fixtures::{name, repo, FakeCompiler, VALID_SCRIPT};
use crate::{Outcome, Repository, ScriptInfo};

#[rstest]
fn empty_repository(repo: (TempDir, Repository)) {
    let (_tmpdir, repo) = repo;

    assert!(!repo.script_exists(&name("a")));
    assert_eq!(0, repo.count_other_scripts(None));
    assert_eq!(0, repo.scripts().count());
    assert_eq!(None, repo.active());
}

/// A repository directory that doesn't exist behaves like an empty one.
#[rstest]
fn missing_repository() {
    let tmpdir = TempDir::new().unwrap();
    let repo = Repository::open(tmpdir.path().join("missing"), Default::default()).unwrap();

    assert_eq!(0, repo.count_other_scripts(None));
    assert_eq!(None, repo.active());
    assert_eq!(
        Outcome::NotFound,
        Outcome::of(&repo.script_source(&name("a")))
    );
}

#[rstest]
fn count_other_scripts(repo: (TempDir, Repository)) {
    let (_tmpdir, repo) = repo;
    repo.put(&FakeCompiler, &name("a"), VALID_SCRIPT).unwrap();
    repo.put(&FakeCompiler, &name("b"), VALID_SCRIPT).unwrap();
    repo.put(&FakeCompiler, &name("c"), VALID_SCRIPT).unwrap();
    repo.activate(&name("a")).unwrap();

    // none of these are scripts
    std::fs::write(repo.path().join(".script"), b"").unwrap();
    std::fs::write(repo.path().join("notes.txt"), b"").unwrap();
    std::fs::write(repo.path().join("d.script.NEW"), b"").unwrap();
    std::fs::create_dir(repo.path().join("e.script")).unwrap();
    symlink("a.script", repo.path().join("f.script")).unwrap();

    assert_eq!(3, repo.count_other_scripts(None));
    assert_eq!(2, repo.count_other_scripts(Some(&name("a"))));
    assert_eq!(3, repo.count_other_scripts(Some(&name("z"))));
    // only exact names are excluded
    assert_eq!(3, repo.count_other_scripts(Some(&name("a.script"))));
}

#[rstest]
fn scripts(repo: (TempDir, Repository)) {
    let (_tmpdir, repo) = repo;
    repo.put(&FakeCompiler, &name("a"), VALID_SCRIPT).unwrap();
    repo.put(&FakeCompiler, &name("b"), VALID_SCRIPT).unwrap();
    repo.activate(&name("b")).unwrap();

    let mut scripts: Vec<ScriptInfo> = repo.scripts().collect();
    scripts.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(
        vec![
            ScriptInfo {
                name: "a".into(),
                active: false
            },
            ScriptInfo {
                name: "b".into(),
                active: true
            },
        ],
        scripts
    );
}

#[rstest]
fn script_exists_follows_links(repo: (TempDir, Repository)) {
    let (_tmpdir, repo) = repo;
    repo.put(&FakeCompiler, &name("a"), VALID_SCRIPT).unwrap();
    symlink("a.script", repo.path().join("b.script")).unwrap();
    symlink("missing.script", repo.path().join("c.script")).unwrap();

    assert!(repo.script_exists(&name("a")));
    assert!(repo.script_exists(&name("b")));
    assert!(!repo.script_exists(&name("c")));
}

#[rstest]
fn script_source_not_found(repo: (TempDir, Repository)) {
    let (_tmpdir, repo) = repo;

    let err = repo.script_source(&name("a")).expect_err("must fail");
    assert_eq!(Outcome::NotFound, err.outcome());
    assert_eq!("script not found: a", err.to_string());
}

/// Sources that can't be opened are reported as missing.
#[rstest]
fn script_source_unopenable(repo: (TempDir, Repository)) {
    let (_tmpdir, repo) = repo;
    symlink("loop.script", repo.path().join("loop.script")).unwrap();

    let err = repo.script_source(&name("loop")).expect_err("must fail");
    assert_eq!(Outcome::NotFound, err.outcome());
}

/// A directory opens fine, but can't be read.
#[rstest]
fn script_source_unreadable(repo: (TempDir, Repository)) {
    let (_tmpdir, repo) = repo;
    std::fs::create_dir(repo.path().join("a.script")).unwrap();

    let err = repo.script_source(&name("a")).expect_err("must fail");
    assert_eq!(Outcome::IoError, err.outcome());
}

#[rstest]
fn is_active_requires_exact_name(repo: (TempDir, Repository)) {
    let (_tmpdir, repo) = repo;
    repo.activate(&name("ab")).unwrap();

    assert!(repo.is_active(&name("ab")));
    assert!(!repo.is_active(&name("a")));
    assert!(!repo.is_active(&name("abc")));
}
