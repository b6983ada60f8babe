//! CLI-only smoke tests that need nothing beyond a POSIX shell.

mod support;

use predicates::prelude::*;
use support::smokecheck;

#[test]
fn smoke_cli_help_lists_commands() {
    smokecheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("exists"))
        .stdout(predicate::str::contains("smoke"));
}

#[test]
fn smoke_cli_version() {
    smokecheck()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn smoke_cli_requires_subcommand() {
    smokecheck().assert().failure().code(2);
}

#[cfg(unix)]
#[test]
fn smoke_cli_check_passing_command() {
    smokecheck()
        .args(["check", "--name", "true works", "--", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✅ true works"))
        .stdout(predicate::str::contains("  Passed: 1"))
        .stdout(predicate::str::contains("  Failed: 0"))
        .stdout(predicate::str::contains("  Total:  1"))
        .stdout(predicate::str::contains("🎉 All tests passed!"));
}

#[cfg(unix)]
#[test]
fn smoke_cli_check_failing_command_exits_one() {
    smokecheck()
        .args(["--style", "plain", "check", "--", "sh", "-c", "exit 3"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL: sh -c 'exit 3'"))
        .stdout(predicate::str::contains("Failed tests:"))
        .stdout(predicate::str::contains("  - sh -c 'exit 3'"))
        .stderr(predicate::str::contains("Error").not());
}

#[cfg(unix)]
#[test]
fn smoke_cli_check_verbose_prints_banner() {
    smokecheck()
        .args(["check", "--verbose", "--name", "echo", "--", "echo", "hidden-output"])
        .assert()
        .success()
        .stdout(predicate::str::contains("🧪 Testing echo..."))
        .stdout(predicate::str::contains("hidden-output").not());
}

#[test]
fn smoke_cli_missing_program_fails_the_check() {
    smokecheck()
        .args(["check", "--", "definitely_not_a_real_program_xyz"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("❌ definitely_not_a_real_program_xyz"));
}
