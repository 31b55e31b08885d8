use clap::Parser;
use expect_test::{expect, Expect};
use sieve_cli::{exit_code, run, Args};
use tempfile::TempDir;

/// Runs the command line in a repository, returning the exit code and
/// whatever was written to stdout.
fn sievedir(repo: &TempDir, cmdline: &[&str], stdin: &str) -> (i32, String) {
    let repository = repo.path().join("sieve");
    let mut argv = vec!["sievedir", "--repository", repository.to_str().unwrap()];
    argv.extend_from_slice(cmdline);

    let args = Args::try_parse_from(argv).expect("arguments must parse");
    let mut stdout = Vec::new();
    let code = match run(&args, stdin.as_bytes(), &mut stdout) {
        Ok(()) => 0,
        Err(e) => exit_code(e.outcome()),
    };

    (code, String::from_utf8(stdout).expect("output must be utf-8"))
}

fn check_output(repo: &TempDir, cmdline: &[&str], expected: Expect) {
    let (code, stdout) = sievedir(repo, cmdline, "");
    assert_eq!(0, code, "{:?} failed", cmdline);
    expected.assert_eq(&stdout);
}

#[test]
fn lifecycle() {
    let repo = TempDir::new().unwrap();

    assert_eq!(0, sievedir(&repo, &["put", "vacation"], "keep;\n").0);
    assert_eq!(0, sievedir(&repo, &["put", "spam"], "if true { discard; }\n").0);
    assert_eq!(0, sievedir(&repo, &["activate", "vacation"], "").0);

    check_output(
        &repo,
        &["list"],
        expect![[r#"
            spam
            vacation (active)
        "#]],
    );
    check_output(&repo, &["active"], expect![[r#"
        vacation
    "#]]);
    check_output(&repo, &["count", "--exclude", "spam"], expect![[r#"
        1
    "#]]);
    check_output(&repo, &["get", "vacation"], expect!["keep;\r\n"]);

    assert_eq!(0, sievedir(&repo, &["rename", "vacation", "away"], "").0);
    check_output(
        &repo,
        &["list"],
        expect![[r#"
            away (active)
            spam
        "#]],
    );

    assert_eq!(0, sievedir(&repo, &["deactivate"], "").0);
    check_output(&repo, &["active"], expect![""]);

    assert_eq!(0, sievedir(&repo, &["delete", "away"], "").0);
    assert_eq!(0, sievedir(&repo, &["delete", "spam"], "").0);
    check_output(&repo, &["count"], expect![[r#"
        0
    "#]]);
}

#[test]
fn exit_codes() {
    let repo = TempDir::new().unwrap();

    // NOTFOUND
    assert_eq!(2, sievedir(&repo, &["delete", "ghost"], "").0);
    assert_eq!(2, sievedir(&repo, &["get", "ghost"], "").0);
    assert_eq!(2, sievedir(&repo, &["activate", "ghost"], "").0);
    // INVALID
    assert_eq!(3, sievedir(&repo, &["put", "bad"], "!!!not valid!!!").0);
    // FAIL
    let deep = format!("{}keep;{}", "if true {".repeat(40), "}".repeat(40));
    assert_eq!(4, sievedir(&repo, &["put", "deep"], &deep).0);

    check_output(&repo, &["list"], expect![""]);
}

#[test]
fn non_utf8_input_is_invalid() {
    let repo = TempDir::new().unwrap();
    let script = repo.path().join("latin1.sieve");
    std::fs::write(&script, b"keep; # gr\xfc\xdfe\n").unwrap();

    assert_eq!(
        3,
        sievedir(&repo, &["put", "latin1", script.to_str().unwrap()], "").0
    );
    assert_eq!(
        3,
        sievedir(&repo, &["check", script.to_str().unwrap()], "").0
    );
    check_output(&repo, &["list"], expect![""]);
}

#[test]
fn invalid_names_are_rejected() {
    assert!(Args::try_parse_from(["sievedir", "get", "a/b"]).is_err());
    assert!(Args::try_parse_from(["sievedir", "get", ""]).is_err());
}

#[test]
fn check_dumps_bytecode() {
    let repo = TempDir::new().unwrap();
    let script = repo.path().join("check.sieve");
    std::fs::write(&script, "require \"fileinto\";\nfileinto \"Junk\";\n").unwrap();

    let (code, stdout) = sievedir(
        &repo,
        &["check", script.to_str().unwrap(), "--dump-bytecode"],
        "",
    );
    assert_eq!(0, code);

    let listing: Vec<String> = stdout
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    expect![[r#"
        [
            "=== compiled code (3 ops, 2 constants) ===",
            "0 2 OpConstant(\"Junk\")",
            "1 | OpCommand(fileinto, 1)",
            "2 | OpStop",
        ]
    "#]]
    .assert_debug_eq(&listing);
}
