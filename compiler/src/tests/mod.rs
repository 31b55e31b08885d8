//! Scripts stored through a repository with the real compiler.
use pretty_assertions::assert_eq;
use sieve_store::{Error, Layout, Outcome, Repository, ScriptCompiler, ScriptName};
use tempfile::TempDir;

use crate::emit::MAGIC;
use crate::SieveCompiler;

fn repo() -> (TempDir, Repository) {
    let tmpdir = TempDir::new().unwrap();
    let repo = Repository::open(tmpdir.path().join("sieve"), Layout::default()).unwrap();
    repo.create_dir().unwrap();
    (tmpdir, repo)
}

fn name(s: &str) -> ScriptName {
    s.parse().unwrap()
}

const VACATION: &str = r#"require ["vacation", "fileinto"];

# out of office
if header :contains "Subject" "urgent" {
    fileinto "Urgent";
    stop;
}
vacation :days 7 :subject "Away" text:
I am away until Monday.
..signature
.
;
"#;

#[test]
fn put_vacation() {
    let (_tmpdir, repo) = repo();

    repo.put(&SieveCompiler, &name("vacation"), VACATION)
        .expect("must succeed");

    let bytecode = std::fs::read(repo.path().join("vacation.bc")).unwrap();
    assert_eq!(MAGIC, &bytecode[..8]);

    repo.activate(&name("vacation")).unwrap();
    assert_eq!(Some("vacation".into()), repo.active());
    assert_eq!(
        VACATION.replace('\n', "\r\n").into_bytes(),
        repo.script_source(&name("vacation")).unwrap()
    );
}

/// CRLF line endings in stored sources parse the same way.
#[test]
fn stored_source_recompiles() {
    let (_tmpdir, repo) = repo();
    repo.put(&SieveCompiler, &name("vacation"), VACATION).unwrap();

    let stored = String::from_utf8(repo.script_source(&name("vacation")).unwrap()).unwrap();
    let from_stored = SieveCompiler.parse(&stored).expect("must parse");
    let original = SieveCompiler.parse(VACATION).expect("must parse");

    assert_eq!(
        SieveCompiler.generate(&original).unwrap().code,
        SieveCompiler.generate(&from_stored).unwrap().code
    );
}

#[test]
fn put_invalid_reports_all_problems() {
    let (_tmpdir, repo) = repo();

    let err = repo
        .put(
            &SieveCompiler,
            &name("broken"),
            "keep;\nfileinto \"x\";\nfrobnicate;\n",
        )
        .expect_err("must fail");

    assert_eq!(Outcome::Invalid, err.outcome());
    match err {
        Error::InvalidScript(diagnostics) => assert_eq!(
            "line 2: fileinto requires the \"fileinto\" capability\nline 3: unknown command \"frobnicate\"",
            diagnostics
        ),
        e => panic!("unexpected error: {}", e),
    }
    assert!(!repo.script_exists(&name("broken")));
}

#[test]
fn put_too_deeply_nested() {
    let (_tmpdir, repo) = repo();
    let source = format!("{}keep;{}", "if true {".repeat(40), "}".repeat(40));

    let err = repo
        .put(&SieveCompiler, &name("deep"), &source)
        .expect_err("must fail");

    assert_eq!(Outcome::Fail, err.outcome());
    assert_eq!(0, repo.count_other_scripts(None));
}
